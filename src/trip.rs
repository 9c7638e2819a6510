use serde::Deserialize;
use thiserror::Error;

use crate::gazetteer;
use crate::planner::{compute_route, RouteError};
use crate::types::{Location, Route, Station, ValidationError, Vehicle};

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Please select a vehicle first")]
    NoVehicle,

    #[error("Please enter valid city names")]
    UnknownCity,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Route request between two coordinates, as sent by the frontend.
#[derive(Deserialize)]
pub struct TripRequest {
    pub start: Location,
    pub end: Location,
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub stations: Vec<Station>,
}

/// Route request between two cities of the gazetteer.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityTripRequest {
    pub start_city: String,
    pub end_city: String,
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub stations: Vec<Station>,
}

/// Validates the records, then plans. Stations that fail validation are
/// skipped rather than failing the whole request.
pub fn plan_trip(request: &TripRequest) -> Result<Route, RequestError> {
    let vehicle = request.vehicle.as_ref().ok_or(RequestError::NoVehicle)?;
    vehicle.validate()?;

    for location in [&request.start, &request.end] {
        if !location.is_valid() {
            return Err(ValidationError::Endpoint(*location).into());
        }
    }

    let stations: Vec<Station> = request
        .stations
        .iter()
        .filter(|station| match station.validate() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Ignoring station {}: {}", station.id, err);
                false
            }
        })
        .cloned()
        .collect();

    Ok(compute_route(request.start, request.end, vehicle, &stations)?)
}

pub fn plan_between_cities(request: CityTripRequest) -> Result<Route, RequestError> {
    if request.vehicle.is_none() {
        return Err(RequestError::NoVehicle);
    }
    let start = gazetteer::lookup(&request.start_city).ok_or(RequestError::UnknownCity)?;
    let end = gazetteer::lookup(&request.end_city).ok_or(RequestError::UnknownCity)?;

    plan_trip(&TripRequest { start, end, vehicle: request.vehicle, stations: request.stations })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VEHICLE: &str = r#"{
        "id": 5,
        "brand": "Renault",
        "model": "Zoe",
        "usable_battery_size": 20,
        "energy_consumption": {"average_consumption": 12}
    }"#;

    fn city_request(start: &str, end: &str, vehicle: Option<&str>) -> CityTripRequest {
        let json = format!(
            r#"{{"startCity": "{}", "endCity": "{}", "vehicle": {}, "stations": [
                {{"id": 9, "city": "Pombal", "location": [39.93, -8.87],
                  "chargers": [{{"id": 1, "chargerType": "DC", "chargerStatus": "AVAILABLE", "chargingSpeed": 50, "pricePerKWh": 0.35}}]}},
                {{"id": 10, "city": "Nowhere", "location": [120.0, 0.0], "chargers": []}}
            ]}}"#,
            start,
            end,
            vehicle.unwrap_or("null")
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_cities_with_one_stop() {
        let route = plan_between_cities(city_request("Lisboa", "porto", Some(VEHICLE))).unwrap();
        assert_eq!(route.stops.len(), 1);
        assert_eq!(route.stops[0].city, "Pombal");
        assert_eq!(route.stops[0].charging_time, 24);
    }

    #[test]
    fn test_missing_vehicle_and_city() {
        assert_eq!(
            plan_between_cities(city_request("Lisboa", "Porto", None)),
            Err(RequestError::NoVehicle)
        );
        let err = plan_between_cities(city_request("Lisboa", "Atlantis", Some(VEHICLE))).unwrap_err();
        assert_eq!(err.to_string(), "Please enter valid city names");
    }

    #[test]
    fn test_route_error_message_passes_through() {
        let request = CityTripRequest { stations: Vec::new(), ..city_request("Lisboa", "Faro", Some(VEHICLE)) };
        // Lisbon to Faro is ~217 km, beyond 167 km of range, and there are no stations
        let err = plan_between_cities(request).unwrap_err();
        assert_eq!(err, RequestError::Route(RouteError::NoSuitableStation));
        assert_eq!(err.to_string(), "No suitable charging station found on the way");
    }
}
