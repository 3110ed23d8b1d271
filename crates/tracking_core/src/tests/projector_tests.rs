use super::*;
use shared::domain::Waypoint;

fn route(points: &[(&str, f64, f64)]) -> Route {
    Route::new(
        points
            .iter()
            .map(|(name, lng, lat)| Waypoint::new("09:00", *name, Coordinate::new(*lng, *lat)))
            .collect(),
    )
    .expect("route")
}

fn three_stop_route() -> Route {
    route(&[("Depot", 0.0, 0.0), ("Junction", 1.0, 1.0), ("Dest", 2.0, 2.0)])
}

fn lies_on_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> bool {
    let cross = (b.lng - a.lng) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lng - a.lng);
    let within = |v: f64, x: f64, y: f64| v >= x.min(y) - 1e-9 && v <= x.max(y) + 1e-9;
    cross.abs() < 1e-9 && within(p.lng, a.lng, b.lng) && within(p.lat, a.lat, b.lat)
}

#[test]
fn midpoint_of_three_stop_route_is_the_junction() {
    let projection = project(&three_stop_route(), 50.0);
    assert_eq!(projection.segment_index, 1);
    assert_eq!(projection.coordinate, Coordinate::new(1.0, 1.0));
}

#[test]
fn endpoints_are_exact() {
    let route = route(&[("A", -73.99, 40.73), ("B", -73.98, 40.74), ("C", -73.97, 40.75)]);
    assert_eq!(project(&route, 0.0).coordinate, route.origin().coordinate);
    assert_eq!(project(&route, 100.0).coordinate, route.destination().coordinate);
}

#[test]
fn out_of_range_progress_never_extrapolates() {
    let route = three_stop_route();
    assert_eq!(project(&route, -20.0).coordinate, route.origin().coordinate);
    assert_eq!(project(&route, f64::NAN).coordinate, route.origin().coordinate);
    assert_eq!(project(&route, 250.0).coordinate, route.destination().coordinate);
    assert_eq!(project(&route, 250.0).segment_index, 1);
}

#[test]
fn every_integer_progress_lands_on_the_polyline() {
    let route = route(&[
        ("Depot", 0.0, 0.0),
        ("Bridge", 3.0, 1.0),
        ("Mall", 3.5, -2.0),
        ("Home", 6.0, 0.5),
    ]);
    let waypoints = route.waypoints();
    for progress in 0..=100 {
        let projection = project(&route, f64::from(progress));
        assert!(projection.segment_index <= waypoints.len() - 2);
        let a = waypoints[projection.segment_index].coordinate;
        let b = waypoints[projection.segment_index + 1].coordinate;
        assert!(
            lies_on_segment(projection.coordinate, a, b),
            "progress {progress} left the route: {:?}",
            projection.coordinate
        );
    }
}

#[test]
fn projection_is_deterministic() {
    let route = three_stop_route();
    assert_eq!(project(&route, 37.0), project(&route, 37.0));
}

#[test]
fn two_stop_route_interpolates_linearly() {
    let route = route(&[("A", 0.0, 0.0), ("B", 10.0, 0.0)]);
    let projection = project(&route, 25.0);
    assert_eq!(projection.segment_index, 0);
    assert!((projection.coordinate.lng - 2.5).abs() < 1e-12);
    assert!((projection.segment_fraction - 0.25).abs() < 1e-12);
}

#[test]
fn remaining_distance_shrinks_to_zero() {
    let route = route(&[("A", 0.0, 0.0), ("B", 0.0, 1.0)]);
    let full = remaining_distance_km(&route, 0.0);
    assert!((full - 111.19).abs() < 0.1, "one degree of latitude, got {full}");
    assert!(remaining_distance_km(&route, 50.0) < full);
    assert!(remaining_distance_km(&route, 100.0).abs() < 1e-9);
}

#[test]
fn eta_requires_a_moving_vehicle() {
    let route = route(&[("A", 0.0, 0.0), ("B", 0.0, 1.0)]);
    let parked = Vehicle::new("Tanker", 0.0).expect("vehicle");
    assert_eq!(estimated_minutes_remaining(&route, 10.0, &parked), None);

    let moving = Vehicle::new("Tanker", 111.19).expect("vehicle");
    assert_eq!(estimated_minutes_remaining(&route, 0.0, &moving), Some(60));
}
