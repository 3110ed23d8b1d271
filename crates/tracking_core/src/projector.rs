use serde::Serialize;
use shared::domain::{Coordinate, Route, Vehicle};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub coordinate: Coordinate,
    /// Index of the segment's starting waypoint, in `0..=len-2`.
    pub segment_index: usize,
    pub segment_fraction: f64,
}

/// Places `progress` (0–100) on the route, treating every segment as an
/// equal share of the trip. Never extrapolates past either endpoint.
pub fn project(route: &Route, progress: f64) -> Projection {
    let waypoints = route.waypoints();
    let last_segment = waypoints.len() - 2;

    if progress.is_nan() || progress <= 0.0 {
        return Projection {
            coordinate: route.origin().coordinate,
            segment_index: 0,
            segment_fraction: 0.0,
        };
    }
    if progress >= 100.0 {
        return Projection {
            coordinate: route.destination().coordinate,
            segment_index: last_segment,
            segment_fraction: 1.0,
        };
    }

    let scaled = progress / 100.0 * (waypoints.len() - 1) as f64;
    let segment_index = (scaled.floor() as usize).min(last_segment);
    let segment_fraction = scaled - segment_index as f64;
    let start = waypoints[segment_index].coordinate;
    let end = waypoints[segment_index + 1].coordinate;

    Projection {
        coordinate: start.lerp(end, segment_fraction),
        segment_index,
        segment_fraction,
    }
}

/// Great-circle distance left between the projected marker and the destination.
pub fn remaining_distance_km(route: &Route, progress: f64) -> f64 {
    let projection = project(route, progress);
    let waypoints = route.waypoints();
    let next = projection.segment_index + 1;

    let mut remaining = haversine_km(projection.coordinate, waypoints[next].coordinate);
    for pair in waypoints[next..].windows(2) {
        remaining += haversine_km(pair[0].coordinate, pair[1].coordinate);
    }
    remaining
}

/// `None` while the vehicle is stationary.
pub fn estimated_minutes_remaining(route: &Route, progress: f64, vehicle: &Vehicle) -> Option<u32> {
    if vehicle.speed_kmh <= 0.0 {
        return None;
    }
    let hours = remaining_distance_km(route, progress) / vehicle.speed_kmh;
    Some((hours * 60.0).round() as u32)
}

fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
#[path = "tests/projector_tests.rs"]
mod tests;
