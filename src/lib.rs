use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use wasm_bindgen_futures::js_sys;

pub mod api;
pub mod booking;
pub mod config;
pub mod export;
pub mod filters;
pub mod gazetteer;
pub mod geodesy;
pub mod planner;
pub mod spatial;
pub mod trip;
pub mod types;

use self::api::ApiClient;
use self::booking::{Booking, PaymentMethod, ReservationAction};
use self::config::Config;
use self::filters::{filter_stations, paginate, search_vehicles, StationFilter, StationSummary};
use self::spatial::StationIndex;
use self::trip::{CityTripRequest, TripRequest};
use self::types::{ChargerDraft, Location, Review, Route, Station, StationId, Vehicle};

thread_local! {
    static CLIENT: RefCell<Option<Rc<ApiClient>>> = const { RefCell::new(None) };
}

fn client() -> Rc<ApiClient> {
    CLIENT.with(|cell| {
        cell.borrow_mut()
            .get_or_insert_with(|| Rc::new(ApiClient::new(Config::default())))
            .clone()
    })
}

/// Installs the console logger and the backend client. `config_json` may be
/// empty.
#[wasm_bindgen]
pub fn rust_init(config_json: String) -> Result<(), JsValue> {
    let config = Config::from_json(&config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    if console_log::init_with_level(config.level()).is_err() {
        log::warn!("Logger already initialized");
    }
    log::info!("Logger initialized from library, backend at {}", config.api_base_url);
    CLIENT.with(|cell| *cell.borrow_mut() = Some(Rc::new(ApiClient::new(config))));
    Ok(())
}

fn to_js(result: Result<String, String>) -> Result<String, JsValue> {
    result.map_err(|e| JsValue::from_str(&e))
}

// ** Route planning **

pub fn compute_route_json(params_json: &str) -> Result<String, String> {
    let request: TripRequest = serde_json::from_str(params_json).map_err(|e| e.to_string())?;
    let route = trip::plan_trip(&request).map_err(|e| e.to_string())?;
    serde_json::to_string(&route).map_err(|e| e.to_string())
}

pub fn plan_between_cities_json(params_json: &str) -> Result<String, String> {
    let request: CityTripRequest = serde_json::from_str(params_json).map_err(|e| e.to_string())?;
    let route = trip::plan_between_cities(request).map_err(|e| e.to_string())?;
    serde_json::to_string(&route).map_err(|e| e.to_string())
}

pub fn route_geojson_json(route_json: &str) -> Result<String, String> {
    let route: Route = serde_json::from_str(route_json).map_err(|e| e.to_string())?;
    serde_json::to_string(&export::route_to_geojson(&route)).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn compute_route(params: String) -> Result<String, JsValue> {
    to_js(compute_route_json(&params))
}

#[wasm_bindgen]
pub fn plan_between_cities(params: String) -> Result<String, JsValue> {
    to_js(plan_between_cities_json(&params))
}

#[wasm_bindgen]
pub fn route_geojson(route: String) -> Result<String, JsValue> {
    to_js(route_geojson_json(&route))
}

#[wasm_bindgen]
pub fn city_names() -> Result<JsValue, JsValue> {
    Ok(serde_wasm_bindgen::to_value(&gazetteer::city_names_sorted())?)
}

// ** Search **

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationSearchParams {
    stations: Vec<Station>,
    #[serde(default)]
    reviews: Vec<Review>,
    #[serde(default)]
    filter: StationFilter,
    /// Sorts results by distance from here when present.
    #[serde(default)]
    near: Option<Location>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StationSearchResult {
    #[serde(flatten)]
    summary: StationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance_km: Option<f64>,
}

pub fn filter_stations_json(params_json: &str) -> Result<String, String> {
    let params: StationSearchParams = serde_json::from_str(params_json).map_err(|e| e.to_string())?;
    let summaries = filter_stations(&params.stations, &params.reviews, &params.filter);

    let distances: HashMap<StationId, f64> = match &params.near {
        Some(origin) => StationIndex::new(&params.stations)
            .nearest(origin, params.stations.len())
            .into_iter()
            .map(|(station, distance)| (station.id, distance))
            .collect(),
        None => HashMap::new(),
    };

    let mut results: Vec<StationSearchResult> = summaries
        .into_iter()
        .map(|summary| {
            let distance_km = distances.get(&summary.id).copied();
            StationSearchResult { summary, distance_km }
        })
        .collect();
    if params.near.is_some() {
        results.sort_by(|a, b| {
            a.distance_km
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
        });
    }

    log::debug!("{} of {} stations match", results.len(), params.stations.len());
    serde_json::to_string(&results).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn filter_stations_js(params: String) -> Result<String, JsValue> {
    to_js(filter_stations_json(&params))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleSearchParams {
    vehicles: Vec<Vehicle>,
    #[serde(default)]
    term: String,
    #[serde(default)]
    page: usize,
    per_page: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VehiclePage<'a> {
    vehicles: Vec<&'a Vehicle>,
    page: usize,
    total_pages: usize,
}

pub fn search_vehicles_json(params_json: &str, default_per_page: usize) -> Result<String, String> {
    let params: VehicleSearchParams = serde_json::from_str(params_json).map_err(|e| e.to_string())?;
    let matches = search_vehicles(&params.vehicles, &params.term);
    let page = paginate(&matches, params.page, params.per_page.unwrap_or(default_per_page));
    let result = VehiclePage { vehicles: page.items.to_vec(), page: page.page, total_pages: page.total_pages };
    serde_json::to_string(&result).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn search_vehicles_js(params: String) -> Result<String, JsValue> {
    to_js(search_vehicles_json(&params, client().config().vehicles_per_page))
}

// ** Booking **

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotParams {
    today: Date,
    station_id: StationId,
    #[serde(default)]
    bookings: Vec<Booking>,
}

pub fn booking_slots_json(params_json: &str) -> Result<String, String> {
    let params: SlotParams = serde_json::from_str(params_json).map_err(|e| e.to_string())?;
    let days = booking::generate_slots(params.today, params.station_id, &params.bookings).map_err(|e| e.to_string())?;
    serde_json::to_string(&days).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn booking_slots(params: String) -> Result<String, JsValue> {
    to_js(booking_slots_json(&params))
}

// ** Backend calls **

fn promise<F>(future: F) -> js_sys::Promise
where
    F: std::future::Future<Output = Result<String, String>> + 'static,
{
    future_to_promise(async move {
        match future.await {
            Ok(json) => Ok(JsValue::from_str(&json)),
            Err(e) => Err(JsValue::from_str(&e)),
        }
    })
}

fn json_of<T: Serialize>(value: Result<T, api::ApiError>) -> Result<String, String> {
    let value = value.map_err(|e| e.to_string())?;
    serde_json::to_string(&value).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn fetch_stations() -> js_sys::Promise {
    let client = client();
    promise(async move { json_of(client.stations().await) })
}

#[wasm_bindgen]
pub fn fetch_vehicles() -> js_sys::Promise {
    let client = client();
    promise(async move { json_of(client.vehicles().await) })
}

#[wasm_bindgen]
pub fn fetch_reviews() -> js_sys::Promise {
    let client = client();
    promise(async move { json_of(client.reviews().await) })
}

#[wasm_bindgen]
pub fn delete_review(id: u32) -> js_sys::Promise {
    let client = client();
    promise(async move { json_of(client.delete_review(id.into()).await) })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChargerSaveParams {
    /// Present when editing an existing charger.
    id: Option<u64>,
    station_id: StationId,
    charger_type: types::ConnectorType,
    charger_status: types::ChargerStatus,
    #[serde(rename = "pricePerKWh")]
    price_per_kwh: f64,
    charging_speed: f64,
}

#[wasm_bindgen]
pub fn save_charger(params: String) -> js_sys::Promise {
    let client = client();
    promise(async move {
        let params: ChargerSaveParams = serde_json::from_str(&params).map_err(|e| e.to_string())?;
        let draft = ChargerDraft {
            station_id: params.station_id,
            charger_type: params.charger_type,
            charger_status: params.charger_status,
            price_per_kwh: params.price_per_kwh,
            charging_speed: params.charging_speed,
        };
        match params.id {
            Some(id) => json_of(client.update_charger(id, &draft).await),
            None => json_of(client.create_charger(&draft).await),
        }
    })
}

#[wasm_bindgen]
pub fn delete_charger(id: u32) -> js_sys::Promise {
    let client = client();
    promise(async move { json_of(client.delete_charger(id.into()).await) })
}

fn parse_action(action: &str) -> Result<ReservationAction, String> {
    match action.to_ascii_lowercase().as_str() {
        "start" => Ok(ReservationAction::Start),
        "stop" => Ok(ReservationAction::Stop),
        "pay" => Ok(ReservationAction::Pay),
        other => Err(format!("Unknown reservation action: {}", other)),
    }
}

/// Starts, stops or pays a reservation after checking the move against the
/// reservation's current status.
#[wasm_bindgen]
pub fn reservation_action(id: u32, action: String, payment_method: Option<String>) -> js_sys::Promise {
    let client = client();
    promise(async move {
        let action = parse_action(&action)?;
        let payment: PaymentMethod = match payment_method {
            Some(method) => serde_json::from_value(serde_json::Value::String(method.to_uppercase()))
                .map_err(|e| e.to_string())?,
            None => PaymentMethod::default(),
        };

        let reservation = client.reservation(id.into()).await.map_err(|e| e.to_string())?;
        reservation.check(action).map_err(|e| e.to_string())?;
        json_of(client.reservation_action(id.into(), action, payment).await)
    })
}
