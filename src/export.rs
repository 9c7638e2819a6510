use geo::{BoundingRect, Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;

use crate::types::{Location, Route};

fn role(index: usize, len: usize) -> &'static str {
    if index == 0 {
        "start"
    } else if index + 1 == len {
        "end"
    } else {
        "stop"
    }
}

fn waypoint_feature(route: &Route, index: usize, location: &Location) -> Feature {
    let mut properties = JsonObject::new();
    let role = role(index, route.coordinates.len());
    properties.insert("role".to_string(), json!(role));
    if role == "stop" {
        properties.insert("label".to_string(), json!(format!("Stop {}", index)));
        if let Some(stop) = route.stops.get(index - 1) {
            properties.insert("city".to_string(), json!(stop.city));
            properties.insert("chargingTime".to_string(), json!(stop.charging_time));
            properties.insert("cost".to_string(), json!(stop.cost));
            properties.insert("batteryLevel".to_string(), json!(stop.battery_level));
        }
    }

    Feature {
        geometry: Some(Geometry::new(Value::from(&geo::Point::<f64>::from(location)))),
        properties: Some(properties),
        ..Default::default()
    }
}

/// Path and waypoints of a route for the map. GeoJSON positions are
/// `[lon, lat]`, unlike the route itself.
pub fn route_to_geojson(route: &Route) -> GeoJson {
    let line: LineString<f64> = route
        .coordinates
        .iter()
        .map(|location| Coord { x: location.longitude, y: location.latitude })
        .collect();

    let bbox = line
        .bounding_rect()
        .map(|rect| vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y]);

    let mut features = Vec::with_capacity(route.coordinates.len() + 1);
    features.push(Feature {
        geometry: Some(Geometry::new(Value::from(&line))),
        ..Default::default()
    });
    features.extend(
        route
            .coordinates
            .iter()
            .enumerate()
            .map(|(index, location)| waypoint_feature(route, index, location)),
    );

    GeoJson::FeatureCollection(FeatureCollection { bbox, features, foreign_members: None })
}
