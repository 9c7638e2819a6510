use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ** Coordinates **

/// A point in decimal degrees. On the wire it is a `[lat, lon]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Location { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<[f64; 2]> for Location {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Location { latitude, longitude }
    }
}

impl From<Location> for [f64; 2] {
    fn from(location: Location) -> Self {
        [location.latitude, location.longitude]
    }
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        geo::Point::new(location.longitude, location.latitude)
    }
}

// ** Backend records **

pub type StationId = u64;
pub type ChargerId = u64;
pub type VehicleId = u64;
pub type ReviewId = u64;

// The backend is not consistent about sending numbers as numbers.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn optional_number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "number_or_string")] f64);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(n)| n))
}

fn optional_year<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_number_or_string(deserializer)?
        .map(|year| {
            if year.fract() != 0.0 {
                return Err(serde::de::Error::custom(format!("invalid release year {}", year)));
            }
            u16::try_from(year as i64).map_err(|_| serde::de::Error::custom(format!("invalid release year {}", year)))
        })
        .transpose()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnergyConsumption {
    /// kWh per 100 km
    #[serde(deserialize_with = "number_or_string")]
    pub average_consumption: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, deserialize_with = "optional_year", skip_serializing_if = "Option::is_none")]
    pub release_year: Option<u16>,
    /// kWh
    #[serde(deserialize_with = "number_or_string")]
    pub usable_battery_size: f64,
    pub energy_consumption: EnergyConsumption,
    /// Advertised range in km, informational only.
    #[serde(
        default,
        deserialize_with = "optional_number_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub range: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Vehicle {
    pub fn battery_capacity_kwh(&self) -> f64 {
        self.usable_battery_size
    }

    pub fn consumption_kwh_per_100km(&self) -> f64 {
        self.energy_consumption.average_consumption
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let capacity = self.battery_capacity_kwh();
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(ValidationError::BatteryCapacity { vehicle: self.id, value: capacity });
        }
        let consumption = self.consumption_kwh_per_100km();
        if !consumption.is_finite() || consumption <= 0.0 {
            return Err(ValidationError::Consumption { vehicle: self.id, value: consumption });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectorType {
    AC1,
    AC2,
    DC,
    #[serde(other)]
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChargerStatus {
    Available,
    Occupied,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charger {
    pub id: ChargerId,
    #[serde(default = "default_connector")]
    pub charger_type: ConnectorType,
    pub charger_status: ChargerStatus,
    /// kW
    #[serde(deserialize_with = "number_or_string")]
    pub charging_speed: f64,
    #[serde(rename = "pricePerKWh", deserialize_with = "number_or_string")]
    pub price_per_kwh: f64,
}

fn default_connector() -> ConnectorType {
    ConnectorType::Other
}

impl Charger {
    pub fn is_available(&self) -> bool {
        self.charger_status == ChargerStatus::Available
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.charging_speed.is_finite() || self.charging_speed <= 0.0 {
            return Err(ValidationError::ChargingSpeed { charger: self.id, value: self.charging_speed });
        }
        if !self.price_per_kwh.is_finite() || self.price_per_kwh < 0.0 {
            return Err(ValidationError::Price { charger: self.id, value: self.price_per_kwh });
        }
        Ok(())
    }
}

/// Body sent when creating or editing a charger from the admin dashboard.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargerDraft {
    pub station_id: StationId,
    pub charger_type: ConnectorType,
    pub charger_status: ChargerStatus,
    #[serde(rename = "pricePerKWh")]
    pub price_per_kwh: f64,
    pub charging_speed: f64,
}

impl Default for ChargerDraft {
    fn default() -> Self {
        ChargerDraft {
            station_id: 0,
            charger_type: ConnectorType::AC1,
            charger_status: ChargerStatus::Available,
            price_per_kwh: 0.0,
            charging_speed: 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    pub location: Location,
    #[serde(default)]
    pub chargers: Vec<Charger>,
}

impl Station {
    pub fn available_chargers(&self) -> impl Iterator<Item = &Charger> {
        self.chargers.iter().filter(|c| c.is_available())
    }

    pub fn has_available_charger(&self) -> bool {
        self.available_chargers().next().is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.location.is_valid() {
            return Err(ValidationError::Location { station: self.id, location: self.location });
        }
        self.chargers.iter().try_for_each(Charger::validate)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub station_id: StationId,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Review {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::Rating { review: self.id, value: self.rating });
        }
        Ok(())
    }
}

// ** Planner output **

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub city: String,
    /// Minutes
    pub charging_time: u32,
    pub cost: f64,
    /// Percent after charging
    pub battery_level: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub coordinates: Vec<Location>,
    pub stops: Vec<Stop>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Vehicle {vehicle} has an invalid battery capacity: {value}")]
    BatteryCapacity { vehicle: VehicleId, value: f64 },

    #[error("Vehicle {vehicle} has an invalid energy consumption: {value}")]
    Consumption { vehicle: VehicleId, value: f64 },

    #[error("Invalid trip endpoint: {0:?}")]
    Endpoint(Location),

    #[error("Station {station} has invalid coordinates: {location:?}")]
    Location { station: StationId, location: Location },

    #[error("Charger {charger} has an invalid charging speed: {value}")]
    ChargingSpeed { charger: ChargerId, value: f64 },

    #[error("Charger {charger} has an invalid price per kWh: {value}")]
    Price { charger: ChargerId, value: f64 },

    #[error("Review {review} has a rating outside 1-5: {value}")]
    Rating { review: ReviewId, value: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_from_backend_json() {
        let json = r#"{
            "id": 7,
            "name": "Station 7",
            "address": "Rua Central 1",
            "city": "Braga",
            "location": [41.5454, -8.4265],
            "chargers": [
                {"id": 1, "chargerType": "DC", "chargerStatus": "AVAILABLE", "chargingSpeed": 500, "pricePerKWh": 0.9},
                {"id": 2, "chargerType": "AC2", "chargerStatus": "OCCUPIED", "chargingSpeed": "22", "pricePerKWh": "0.35"}
            ]
        }"#;
        let station: Station = serde_json::from_str(json).unwrap();
        assert_eq!(station.location, Location::new(41.5454, -8.4265));
        assert_eq!(station.chargers[1].charging_speed, 22.0);
        assert_eq!(station.chargers[1].price_per_kwh, 0.35);
        assert_eq!(station.available_chargers().count(), 1);
        assert!(station.validate().is_ok());
    }

    #[test]
    fn test_unknown_connector_is_other() {
        let json = r#"{"id": 3, "chargerType": "CHAdeMO", "chargerStatus": "AVAILABLE", "chargingSpeed": 50, "pricePerKWh": 0.5}"#;
        let charger: Charger = serde_json::from_str(json).unwrap();
        assert_eq!(charger.charger_type, ConnectorType::Other);
    }

    #[test]
    fn test_vehicle_accepts_string_battery() {
        let json = r#"{
            "id": 12,
            "brand": "Abarth",
            "model": "600e Scorpionissima",
            "release_year": "2024",
            "usable_battery_size": "50.8",
            "energy_consumption": {"average_consumption": 17.5}
        }"#;
        let vehicle: Vehicle = serde_json::from_str(json).unwrap();
        assert_eq!(vehicle.battery_capacity_kwh(), 50.8);
        assert_eq!(vehicle.release_year, Some(2024));
        assert_eq!(vehicle.display_name(), "Abarth 600e Scorpionissima");
        assert!(vehicle.validate().is_ok());
    }

    #[test]
    fn test_release_year_out_of_range() {
        for year in ["70000", "-1", "2024.5", "\"soon\""] {
            let json = format!(
                r#"{{"id": 1, "release_year": {}, "usable_battery_size": 40, "energy_consumption": {{"average_consumption": 15}}}}"#,
                year
            );
            assert!(serde_json::from_str::<Vehicle>(&json).is_err(), "accepted {}", year);
        }
        let json = r#"{"id": 1, "release_year": 2021.0, "usable_battery_size": 40, "energy_consumption": {"average_consumption": 15}}"#;
        assert_eq!(serde_json::from_str::<Vehicle>(json).unwrap().release_year, Some(2021));
    }

    #[test]
    fn test_vehicle_rejects_zero_consumption() {
        let json = r#"{"id": 1, "usable_battery_size": 40, "energy_consumption": {"average_consumption": 0}}"#;
        let vehicle: Vehicle = serde_json::from_str(json).unwrap();
        assert_eq!(
            vehicle.validate(),
            Err(ValidationError::Consumption { vehicle: 1, value: 0.0 })
        );
    }

    #[test]
    fn test_station_rejects_bad_latitude() {
        let station = Station {
            id: 4,
            name: String::new(),
            address: String::new(),
            city: String::new(),
            location: Location::new(91.0, 0.0),
            chargers: Vec::new(),
        };
        assert!(matches!(station.validate(), Err(ValidationError::Location { station: 4, .. })));
    }

    #[test]
    fn test_route_wire_shape() {
        let route = Route {
            coordinates: vec![Location::new(38.7169, -9.1399), Location::new(41.1496, -8.6109)],
            stops: vec![Stop { city: "Coimbra".into(), charging_time: 24, cost: 7.0, battery_level: 100.0 }],
        };
        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(value["coordinates"][0][0], 38.7169);
        assert_eq!(value["stops"][0]["chargingTime"], 24);
        assert_eq!(value["stops"][0]["batteryLevel"], 100.0);
    }
}
