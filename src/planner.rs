use std::cmp::Ordering;
use std::collections::HashSet;

use thiserror::Error;

use crate::geodesy::{autonomy_km, battery_percent_for, haversine_km, is_on_the_way};
use crate::types::{Charger, Location, Route, Station, StationId, Stop, Vehicle};

/// Every stop charges the battery back to full.
pub const FULL_BATTERY: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("No suitable charging station found on the way")]
    NoSuitableStation,

    #[error("Loop detected - already visited this station")]
    LoopDetected,

    #[error("Cannot reach next charging station")]
    CannotReachStation,
}

/// Minutes to charge an empty battery to full.
pub fn full_charging_minutes(battery_capacity_kwh: f64, charger_speed_kw: f64) -> f64 {
    (battery_capacity_kwh / charger_speed_kw) * 60.0
}

/// Price of a full battery.
pub fn full_charging_cost(battery_capacity_kwh: f64, price_per_kwh: f64) -> f64 {
    battery_capacity_kwh * price_per_kwh
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fastest available charger, the first one listed when speeds tie.
pub fn fastest_available_charger(station: &Station) -> Option<&Charger> {
    station.available_chargers().fold(None, |best: Option<&Charger>, charger| match best {
        Some(b) if b.charging_speed >= charger.charging_speed => Some(b),
        _ => Some(charger),
    })
}

/// Nearest station that has an available charger, lies in the direction of
/// `end` and can be reached with `battery_level` percent left.
pub fn find_best_charging_station<'a>(
    stations: &'a [Station],
    current: &Location,
    end: &Location,
    battery_level: f64,
    vehicle: &Vehicle,
) -> Option<&'a Station> {
    let autonomy = autonomy_km(battery_level, vehicle);

    stations
        .iter()
        .filter(|station| station.has_available_charger())
        .filter(|station| is_on_the_way(current, &station.location, end))
        .map(|station| (station, haversine_km(current, &station.location)))
        .filter(|(_, distance)| *distance <= autonomy)
        // min_by keeps the first of equal elements
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(station, _)| station)
}

/// Battery left after driving `distance_km`, or an error if it would run dry.
fn drive(battery_level: f64, distance_km: f64, vehicle: &Vehicle) -> Result<f64, RouteError> {
    let remaining = battery_level - battery_percent_for(distance_km, vehicle);
    if remaining < 0.0 {
        return Err(RouteError::CannotReachStation);
    }
    Ok(remaining)
}

fn charge_at(station: &Station, vehicle: &Vehicle) -> Result<Stop, RouteError> {
    // Candidates always have an available charger; guard anyway.
    let charger = fastest_available_charger(station).ok_or(RouteError::NoSuitableStation)?;
    let capacity = vehicle.battery_capacity_kwh();

    Ok(Stop {
        city: station.city.clone(),
        charging_time: full_charging_minutes(capacity, charger.charging_speed).round() as u32,
        cost: round_cents(full_charging_cost(capacity, charger.price_per_kwh)),
        battery_level: FULL_BATTERY,
    })
}

/// Greedily inserts charging stops between `start` and `end` so the battery
/// never runs out. Each stop recharges to 100%.
///
/// The vehicle must have a positive battery capacity and consumption; see
/// [`Vehicle::validate`].
pub fn compute_route(
    start: Location,
    end: Location,
    vehicle: &Vehicle,
    stations: &[Station],
) -> Result<Route, RouteError> {
    let mut route = Route { coordinates: vec![start], stops: Vec::new() };
    let mut current = start;
    let mut battery_level = FULL_BATTERY;
    let mut visited: HashSet<StationId> = HashSet::new();

    loop {
        let distance_to_end = haversine_km(&current, &end);
        let battery_needed = battery_percent_for(distance_to_end, vehicle);
        log::debug!(
            "At {:?} with {:.1}% battery, {:.1} km to destination needs {:.1}%",
            current,
            battery_level,
            distance_to_end,
            battery_needed
        );

        if battery_level >= battery_needed {
            route.coordinates.push(end);
            break;
        }

        let next_station = find_best_charging_station(stations, &current, &end, battery_level, vehicle)
            .ok_or(RouteError::NoSuitableStation)?;

        if !visited.insert(next_station.id) {
            log::warn!("Station {} selected twice", next_station.id);
            return Err(RouteError::LoopDetected);
        }

        let distance_to_station = haversine_km(&current, &next_station.location);
        battery_level = drive(battery_level, distance_to_station, vehicle)?;

        let stop = charge_at(next_station, vehicle)?;
        log::debug!(
            "Stopping at station {} ({}) with {:.1}% left: {} min, {:.2}",
            next_station.id,
            stop.city,
            battery_level,
            stop.charging_time,
            stop.cost
        );
        route.stops.push(stop);

        route.coordinates.push(next_station.location);
        current = next_station.location;
        battery_level = FULL_BATTERY;
    }

    log::info!("Route computed with {} charging stops", route.stops.len());
    Ok(route)
}

impl Route {
    /// Straight-line length of the path through all coordinates.
    pub fn total_distance_km(&self) -> f64 {
        self.coordinates.windows(2).map(|pair| haversine_km(&pair[0], &pair[1])).sum()
    }

    pub fn total_charging_minutes(&self) -> u32 {
        self.stops.iter().map(|stop| stop.charging_time).sum()
    }

    pub fn total_cost(&self) -> f64 {
        round_cents(self.stops.iter().map(|stop| stop.cost).sum())
    }
}
