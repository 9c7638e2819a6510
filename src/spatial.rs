use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geodesy::haversine_km;
use crate::types::{Location, Station};

const EARTH_RADIUS_KM: f64 = 6371.0;
const HALF_CIRCUMFERENCE_KM: f64 = std::f64::consts::PI * EARTH_RADIUS_KM;

// Stations are indexed as points on the unit sphere. Chord length grows
// monotonically with great-circle distance, so the tree's Euclidean metric
// orders candidates the same way haversine does.
fn unit_vector(location: &Location) -> [f64; 3] {
    let lat = location.latitude.to_radians();
    let lon = location.longitude.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn chord_for_km(distance_km: f64) -> f64 {
    let angle = (distance_km / EARTH_RADIUS_KM).min(std::f64::consts::PI);
    2.0 * (angle / 2.0).sin()
}

struct IndexedStation {
    position: [f64; 3],
    index: usize,
}

impl RTreeObject for IndexedStation {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedStation {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        self.position
            .iter()
            .zip(point.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Nearby-station lookups for the search page.
pub struct StationIndex<'a> {
    stations: &'a [Station],
    tree: RTree<IndexedStation>,
}

impl<'a> StationIndex<'a> {
    pub fn new(stations: &'a [Station]) -> Self {
        let entries = stations
            .iter()
            .enumerate()
            .map(|(index, station)| IndexedStation { position: unit_vector(&station.location), index })
            .collect();
        StationIndex { stations, tree: RTree::bulk_load(entries) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stations within `radius_km` of `origin` with their distance, nearest
    /// first.
    pub fn within_km(&self, origin: &Location, radius_km: f64) -> Vec<(&'a Station, f64)> {
        let chord = chord_for_km(radius_km);
        let mut found: Vec<(&'a Station, f64)> = self
            .tree
            .locate_within_distance(unit_vector(origin), chord * chord)
            .map(|entry| {
                let station = &self.stations[entry.index];
                (station, haversine_km(origin, &station.location))
            })
            .filter(|(_, distance)| *distance <= radius_km)
            .collect();
        found.sort_by(|(a_station, a), (b_station, b)| a.total_cmp(b).then(a_station.id.cmp(&b_station.id)));
        found
    }

    /// The `count` stations closest to `origin`, nearest first.
    pub fn nearest(&self, origin: &Location, count: usize) -> Vec<(&'a Station, f64)> {
        if count == 0 {
            return Vec::new();
        }
        let mut radius_km = 10.0;
        loop {
            let mut found = self.within_km(origin, radius_km);
            if found.len() >= count || radius_km >= HALF_CIRCUMFERENCE_KM {
                found.truncate(count);
                return found;
            }
            radius_km = (radius_km * 2.0).min(HALF_CIRCUMFERENCE_KM);
        }
    }
}
