use std::cell::{RefCell, RefMut};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::booking::{PaymentMethod, Reservation, ReservationAction};
use crate::config::Config;
use crate::types::{Charger, ChargerDraft, ChargerId, Review, ReviewId, Station, StationId, ValidationError, Vehicle};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Invalid record from backend: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Prefers the backend's `message` field, falls back to the status code.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status))
}

/// Vehicles with unreadable or unusable battery data are dropped, not fatal.
fn usable_vehicles(records: Vec<Value>) -> Vec<Vehicle> {
    records
        .into_iter()
        .filter_map(|record| {
            let vehicle = match serde_json::from_value::<Vehicle>(record) {
                Ok(vehicle) => vehicle,
                Err(err) => {
                    log::warn!("Skipping unreadable vehicle: {}", err);
                    return None;
                }
            };
            match vehicle.validate() {
                Ok(()) => Some(vehicle),
                Err(err) => {
                    log::warn!("Skipping vehicle: {}", err);
                    None
                }
            }
        })
        .collect()
}

/// Typed access to the charging-network backend. The station list is cached
/// after the first successful fetch. Single-threaded, like the wasm host.
pub struct ApiClient {
    config: Config,
    client: Client,
    stations: RefCell<Option<Vec<Station>>>,
}

impl ApiClient {
    pub fn new(config: Config) -> Self {
        Self { config, client: Client::new(), stations: RefCell::new(None) }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // Borrows never span an await.
    fn cache(&self) -> RefMut<'_, Option<Vec<Station>>> {
        self.stations.borrow_mut()
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send_raw(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = error_message(status.as_u16(), &body);
            log::warn!("Backend answered {}: {}", status, message);
            return Err(ApiError::Api { status: status.as_u16(), message });
        }
        Ok(body)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.config.endpoint(path))
    }

    // ** Stations **

    pub async fn stations(&self) -> Result<Vec<Station>, ApiError> {
        let cached = self.cache().clone();
        if let Some(stations) = cached {
            log::debug!("Using {} cached stations", stations.len());
            return Ok(stations);
        }

        let stations: Vec<Station> = self.send(self.get("stations")).await?;
        stations.iter().try_for_each(Station::validate)?;
        log::info!("Fetched {} stations", stations.len());

        *self.cache() = Some(stations.clone());
        Ok(stations)
    }

    pub fn invalidate_stations(&self) {
        *self.cache() = None;
    }

    pub async fn station(&self, id: StationId) -> Result<Station, ApiError> {
        let station: Station = self.send(self.get(&format!("stations/{}", id))).await?;
        station.validate()?;
        Ok(station)
    }

    // ** Chargers (admin) **

    pub async fn create_charger(&self, draft: &ChargerDraft) -> Result<Charger, ApiError> {
        let request = self.client.post(self.config.endpoint("chargers")).json(draft);
        let charger: Charger = self.send(request).await?;
        charger.validate()?;
        self.invalidate_stations();
        Ok(charger)
    }

    pub async fn update_charger(&self, id: ChargerId, draft: &ChargerDraft) -> Result<Charger, ApiError> {
        let request = self.client.put(self.config.endpoint(&format!("chargers/{}", id))).json(draft);
        let charger: Charger = self.send(request).await?;
        charger.validate()?;
        self.invalidate_stations();
        Ok(charger)
    }

    pub async fn delete_charger(&self, id: ChargerId) -> Result<(), ApiError> {
        self.send_raw(self.client.delete(self.config.endpoint(&format!("chargers/{}", id)))).await?;
        self.invalidate_stations();
        Ok(())
    }

    // ** Vehicles and reviews **

    pub async fn vehicles(&self) -> Result<Vec<Vehicle>, ApiError> {
        let records: Vec<Value> = self.send(self.get("vehicles")).await?;
        Ok(usable_vehicles(records))
    }

    pub async fn reviews(&self) -> Result<Vec<Review>, ApiError> {
        let reviews: Vec<Review> = self.send(self.get("reviews")).await?;
        reviews.iter().try_for_each(Review::validate)?;
        Ok(reviews)
    }

    pub async fn delete_review(&self, id: ReviewId) -> Result<(), ApiError> {
        self.send_raw(self.client.delete(self.config.endpoint(&format!("reviews/{}", id)))).await?;
        Ok(())
    }

    // ** Reservations **

    pub async fn reservation(&self, id: u64) -> Result<Reservation, ApiError> {
        self.send(self.get(&format!("reservations/{}", id))).await
    }

    /// POSTs the action; the backend answers with the updated reservation.
    /// Callers check [`Reservation::check`] first.
    pub async fn reservation_action(
        &self,
        id: u64,
        action: ReservationAction,
        payment: PaymentMethod,
    ) -> Result<Reservation, ApiError> {
        let url = self.config.endpoint(&format!("reservations/{}/{}", id, action.path()));
        log::info!("Reservation {}: {}", id, action);
        let request = match action {
            ReservationAction::Pay => self.client.post(url).json(&json!({ "paymentMethod": payment })),
            ReservationAction::Start | ReservationAction::Stop => self.client.post(url),
        };
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    #[test]
    fn test_error_message_from_body() {
        assert_eq!(error_message(409, r#"{"message": "Charger is occupied"}"#), "Charger is occupied");
        assert_eq!(error_message(500, "<html>oops</html>"), "Request failed with status 500");
        assert_eq!(error_message(404, r#"{"message": ""}"#), "Request failed with status 404");
    }

    #[test]
    fn test_invalidate_clears_cache() {
        let client = ApiClient::new(Config::default());
        *client.cache() = Some(vec![Station {
            id: 1,
            name: String::new(),
            address: String::new(),
            city: "Lisboa".into(),
            location: Location::new(38.7, -9.1),
            chargers: Vec::new(),
        }]);
        assert!(client.cache().is_some());
        client.invalidate_stations();
        assert!(client.cache().is_none());
    }

    #[test]
    fn test_malformed_vehicle_is_skipped() {
        let records: Vec<Value> = serde_json::from_str(
            r#"[
                {"id": 1, "brand": "Abarth", "model": "600e", "usable_battery_size": 50.8, "energy_consumption": {"average_consumption": 17}},
                {"id": 2, "brand": "Ghost", "model": "Null", "usable_battery_size": null, "energy_consumption": {"average_consumption": 17}},
                {"id": 3, "brand": "Ghost", "model": "Missing", "energy_consumption": {"average_consumption": 17}},
                {"id": 4, "brand": "Ghost", "model": "Empty", "usable_battery_size": 0, "energy_consumption": {"average_consumption": 17}},
                {"id": 5, "brand": "BMW", "model": "i4", "usable_battery_size": "80.7", "energy_consumption": {"average_consumption": 18}}
            ]"#,
        )
        .unwrap();
        let ids: Vec<_> = usable_vehicles(records).iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_payment_body() {
        let body = json!({ "paymentMethod": PaymentMethod::Mobile });
        assert_eq!(body.to_string(), r#"{"paymentMethod":"MOBILE"}"#);
    }
}
