use serde::{Deserialize, Serialize};

use crate::types::{ConnectorType, Review, Station, StationId, Vehicle};

/// What the station list shows for one station, derived from its chargers and
/// reviews.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    pub id: StationId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub available: usize,
    pub total: usize,
    pub connectors: Vec<ConnectorType>,
    /// kW, `None` for a station without chargers
    pub max_power: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: usize,
}

impl StationSummary {
    pub fn from_station(station: &Station, reviews: &[Review]) -> Self {
        let mut connectors = Vec::new();
        for charger in &station.chargers {
            if !connectors.contains(&charger.charger_type) {
                connectors.push(charger.charger_type);
            }
        }

        let max_power = station.chargers.iter().map(|c| c.charging_speed).fold(None, |max: Option<f64>, speed| {
            Some(max.map_or(speed, |m| m.max(speed)))
        });

        let ratings: Vec<f64> = reviews
            .iter()
            .filter(|review| review.station_id == station.id)
            .map(|review| review.rating as f64)
            .collect();
        let rating = if ratings.is_empty() {
            None
        } else {
            let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
            Some((mean * 10.0).round() / 10.0)
        };

        StationSummary {
            id: station.id,
            name: station.name.clone(),
            address: station.address.clone(),
            city: station.city.clone(),
            available: station.available_chargers().count(),
            total: station.chargers.len(),
            connectors,
            max_power,
            rating,
            review_count: ratings.len(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerLevel {
    #[default]
    All,
    /// Up to 22 kW
    Low,
    /// Above 22 kW, up to 50 kW
    Medium,
    /// Above 50 kW
    High,
}

impl PowerLevel {
    /// A station without a power rating is never filtered out by level.
    pub fn matches(&self, max_power: Option<f64>) -> bool {
        match (self, max_power) {
            (PowerLevel::All, _) | (_, None) => true,
            (PowerLevel::Low, Some(kw)) => kw <= 22.0,
            (PowerLevel::Medium, Some(kw)) => kw > 22.0 && kw <= 50.0,
            (PowerLevel::High, Some(kw)) => kw > 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StationFilter {
    pub search_term: String,
    pub available_only: bool,
    /// `None` means every connector type
    pub connector_type: Option<ConnectorType>,
    pub power_level: PowerLevel,
}

impl Default for StationFilter {
    fn default() -> Self {
        StationFilter {
            search_term: String::new(),
            available_only: true,
            connector_type: None,
            power_level: PowerLevel::All,
        }
    }
}

impl StationFilter {
    pub fn matches(&self, summary: &StationSummary) -> bool {
        let term = self.search_term.trim().to_lowercase();
        let matches_search = term.is_empty()
            || [&summary.name, &summary.address, &summary.city]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));

        let matches_availability = !self.available_only || summary.available > 0;

        let matches_connector = self
            .connector_type
            .map_or(true, |connector| summary.connectors.contains(&connector));

        matches_search && matches_availability && matches_connector && self.power_level.matches(summary.max_power)
    }
}

pub fn filter_stations(stations: &[Station], reviews: &[Review], filter: &StationFilter) -> Vec<StationSummary> {
    stations
        .iter()
        .map(|station| StationSummary::from_station(station, reviews))
        .filter(|summary| filter.matches(summary))
        .collect()
}

// ** Vehicle picker **

pub fn search_vehicles<'a>(vehicles: &'a [Vehicle], term: &str) -> Vec<&'a Vehicle> {
    let term = term.to_lowercase();
    vehicles
        .iter()
        .filter(|vehicle| vehicle.display_name().to_lowercase().contains(&term))
        .collect()
}

#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based, clamped to the available pages
    pub page: usize,
    pub total_pages: usize,
}

pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));

    let start = ((page - 1) * per_page).min(items.len());
    let end = (start + per_page).min(items.len());
    Page { items: &items[start..end], page, total_pages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Charger, ChargerStatus, EnergyConsumption, Location};

    fn charger(id: u64, kind: ConnectorType, status: ChargerStatus, speed: f64) -> Charger {
        Charger { id, charger_type: kind, charger_status: status, charging_speed: speed, price_per_kwh: 0.4 }
    }

    fn stations() -> Vec<Station> {
        vec![
            Station {
                id: 1,
                name: "Central Lisbon Charging Hub".into(),
                address: "Rua do Comércio 123, Lisboa".into(),
                city: "Lisboa".into(),
                location: Location::new(38.7089, -9.1366),
                chargers: vec![
                    charger(1, ConnectorType::AC2, ChargerStatus::Available, 22.0),
                    charger(2, ConnectorType::AC2, ChargerStatus::Occupied, 11.0),
                ],
            },
            Station {
                id: 2,
                name: "Shopping Colombo Station".into(),
                address: "Av. Lusíada, 1500-392 Lisboa".into(),
                city: "Lisboa".into(),
                location: Location::new(38.7516, -9.1843),
                chargers: vec![
                    charger(3, ConnectorType::DC, ChargerStatus::Occupied, 50.0),
                    charger(4, ConnectorType::AC1, ChargerStatus::Occupied, 7.4),
                ],
            },
            Station {
                id: 3,
                name: "Parque das Nações Fast Charge".into(),
                address: "Alameda dos Oceanos, 1990-203 Lisboa".into(),
                city: "Lisboa".into(),
                location: Location::new(38.7682, -9.0954),
                chargers: vec![
                    charger(5, ConnectorType::DC, ChargerStatus::Available, 150.0),
                    charger(6, ConnectorType::AC2, ChargerStatus::Available, 22.0),
                ],
            },
            Station {
                id: 4,
                name: "Porto EV Station".into(),
                address: "Avenida dos Aliados 50".into(),
                city: "Porto".into(),
                location: Location::new(41.1496, -8.6109),
                chargers: Vec::new(),
            },
        ]
    }

    fn review(id: u64, station_id: StationId, rating: u8) -> Review {
        Review { id, station_id, rating, comment: None }
    }

    #[test]
    fn test_summary_counts_and_connectors() {
        let reviews = vec![review(1, 3, 5), review(2, 3, 4), review(3, 1, 2)];
        let summary = StationSummary::from_station(&stations()[2], &reviews);
        assert_eq!(summary.available, 2);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.connectors, vec![ConnectorType::DC, ConnectorType::AC2]);
        assert_eq!(summary.max_power, Some(150.0));
        assert_eq!(summary.rating, Some(4.5));
        assert_eq!(summary.review_count, 2);

        let empty = StationSummary::from_station(&stations()[3], &reviews);
        assert_eq!(empty.max_power, None);
        assert_eq!(empty.rating, None);
        assert!(empty.connectors.is_empty());
    }

    #[test]
    fn test_default_filter_hides_unavailable() {
        let ids: Vec<_> = filter_stations(&stations(), &[], &StationFilter::default()).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_search_is_case_insensitive_on_name_address_city() {
        let filter = StationFilter { search_term: "COLOMBO".into(), available_only: false, ..Default::default() };
        let ids: Vec<_> = filter_stations(&stations(), &[], &filter).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2]);

        let filter = StationFilter { search_term: "porto".into(), available_only: false, ..Default::default() };
        assert_eq!(filter_stations(&stations(), &[], &filter).len(), 1);
    }

    #[test]
    fn test_connector_and_power_filters() {
        let filter = StationFilter {
            available_only: false,
            connector_type: Some(ConnectorType::DC),
            power_level: PowerLevel::Medium,
            ..Default::default()
        };
        let ids: Vec<_> = filter_stations(&stations(), &[], &filter).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2]);

        // Porto has no chargers, hence no rating, and stays listed.
        let filter = StationFilter { power_level: PowerLevel::High, available_only: false, ..Default::default() };
        let ids: Vec<_> = filter_stations(&stations(), &[], &filter).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_power_level_bounds() {
        assert!(PowerLevel::Low.matches(Some(22.0)));
        assert!(!PowerLevel::Medium.matches(Some(22.0)));
        assert!(PowerLevel::Medium.matches(Some(50.0)));
        assert!(PowerLevel::High.matches(Some(50.1)));
        assert!(PowerLevel::Low.matches(None));
        assert!(PowerLevel::High.matches(None));
        assert!(PowerLevel::All.matches(None));
    }

    #[test]
    fn test_filter_from_json() {
        let filter: StationFilter =
            serde_json::from_str(r#"{"searchTerm": "lis", "connectorType": "AC2", "powerLevel": "low"}"#).unwrap();
        assert!(filter.available_only);
        assert_eq!(filter.connector_type, Some(ConnectorType::AC2));
        assert_eq!(filter.power_level, PowerLevel::Low);
    }

    fn vehicle(id: u64, brand: &str, model: &str) -> Vehicle {
        Vehicle {
            id,
            brand: brand.into(),
            model: model.into(),
            release_year: None,
            usable_battery_size: 50.0,
            energy_consumption: EnergyConsumption { average_consumption: 17.0 },
            range: None,
            image_url: None,
        }
    }

    #[test]
    fn test_vehicle_search_and_pages() {
        let mut vehicles: Vec<_> = (0..20).map(|i| vehicle(i, "Tesla", &format!("Model {}", i))).collect();
        vehicles.push(vehicle(99, "Abarth", "600e Scorpionissima"));

        assert_eq!(search_vehicles(&vehicles, "abarth 600").len(), 1);
        let teslas = search_vehicles(&vehicles, "tesla");
        assert_eq!(teslas.len(), 20);

        let page = paginate(&teslas, 3, 9);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);

        let clamped = paginate(&teslas, 10, 9);
        assert_eq!(clamped.page, 3);
        let first = paginate(&teslas, 0, 9);
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 9);

        let none: Page<'_, &Vehicle> = paginate(&[], 1, 9);
        assert_eq!(none.total_pages, 0);
        assert_eq!(none.page, 1);
        assert!(none.items.is_empty());
    }
}
