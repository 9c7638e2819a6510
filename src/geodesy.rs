use crate::types::{Location, Vehicle};

/// Minimum cosine between the bearing to a station and the bearing to the
/// destination for the station to count as "on the way" (about 37 degrees).
pub const ON_THE_WAY_MIN_COSINE: f64 = 0.8;

fn to_haversine_point(location: &Location) -> haversine_rs::point::Point {
    haversine_rs::point::Point { latitude: location.latitude, longitude: location.longitude }
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: &Location, b: &Location) -> f64 {
    haversine_rs::distance(to_haversine_point(a), to_haversine_point(b), haversine_rs::units::Unit::Meters) / 1000.0
}

/// kWh needed to cover `distance_km` at `consumption` kWh/100km.
pub fn energy_for_distance(distance_km: f64, consumption: f64) -> f64 {
    distance_km * consumption / 100.0
}

/// Share of the battery, in percent, spent driving `distance_km`.
pub fn battery_percent_for(distance_km: f64, vehicle: &Vehicle) -> f64 {
    energy_for_distance(distance_km, vehicle.consumption_kwh_per_100km()) / vehicle.battery_capacity_kwh() * 100.0
}

/// Distance the vehicle can still drive with `battery_percent` left.
pub fn autonomy_km(battery_percent: f64, vehicle: &Vehicle) -> f64 {
    (battery_percent / 100.0) * vehicle.battery_capacity_kwh() * (100.0 / vehicle.consumption_kwh_per_100km())
}

/// Compares raw degree deltas, not bearings on the sphere. A candidate sitting
/// exactly on `current` gives a zero vector and is never on the way.
pub fn is_on_the_way(current: &Location, candidate: &Location, end: &Location) -> bool {
    let to_candidate = [candidate.latitude - current.latitude, candidate.longitude - current.longitude];
    let to_end = [end.latitude - current.latitude, end.longitude - current.longitude];

    let dot = to_candidate[0] * to_end[0] + to_candidate[1] * to_end[1];
    let mag_candidate = to_candidate[0].hypot(to_candidate[1]);
    let mag_end = to_end[0].hypot(to_end[1]);

    let cos_theta = dot / (mag_candidate * mag_end);
    // NaN compares false
    cos_theta > ON_THE_WAY_MIN_COSINE
}
