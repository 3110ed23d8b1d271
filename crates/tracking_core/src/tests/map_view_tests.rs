use super::*;

fn controller() -> MapViewController {
    MapViewController::new(MapViewSettings {
        min_zoom: 3.0,
        max_zoom: 6.0,
        zoom_step: 1.0,
        initial_zoom: 5.0,
        initial_center: Coordinate::new(0.0, 0.0),
        override_window: Duration::from_secs(4),
    })
}

#[tokio::test(start_paused = true)]
async fn follows_marker_and_keeps_zoom() {
    let mut map = controller();
    assert_eq!(map.follow_mode(), FollowMode::Automatic);

    let outcome = map.follow_marker(Coordinate::new(1.0, 2.0));
    assert_eq!(outcome, FollowOutcome::Recentered);
    assert_eq!(map.viewport().center, Coordinate::new(1.0, 2.0));
    assert_eq!(map.viewport().zoom, 5.0);
}

#[tokio::test(start_paused = true)]
async fn zoom_suppresses_follow_until_window_elapses() {
    let mut map = controller();
    map.zoom_in();

    let outcome = map.follow_marker(Coordinate::new(1.0, 1.0));
    assert_eq!(outcome, FollowOutcome::Suppressed);
    assert_eq!(map.viewport().center, Coordinate::new(0.0, 0.0));
    assert_eq!(map.follow_mode(), FollowMode::UserOverride);

    tokio::time::advance(Duration::from_secs(4)).await;

    let outcome = map.follow_marker(Coordinate::new(2.0, 2.0));
    assert_eq!(outcome, FollowOutcome::Recentered);
    assert_eq!(map.viewport().center, Coordinate::new(2.0, 2.0));
    assert_eq!(map.viewport().zoom, 6.0);
}

#[tokio::test(start_paused = true)]
async fn override_window_is_refreshed_not_stacked() {
    let mut map = controller();
    map.zoom_out();
    tokio::time::advance(Duration::from_secs(3)).await;
    map.zoom_in();
    tokio::time::advance(Duration::from_secs(3)).await;

    // 6s after the first gesture but only 3s after the latest one.
    assert_eq!(
        map.follow_marker(Coordinate::new(1.0, 1.0)),
        FollowOutcome::Suppressed
    );

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(
        map.follow_marker(Coordinate::new(1.0, 1.0)),
        FollowOutcome::Recentered
    );
}

#[tokio::test(start_paused = true)]
async fn zoom_is_clamped_to_bounds() {
    let mut map = controller();
    assert_eq!(map.zoom_in(), 6.0);
    assert_eq!(map.zoom_in(), 6.0);
    for _ in 0..10 {
        map.zoom_out();
    }
    assert_eq!(map.viewport().zoom, 3.0);
}

#[tokio::test(start_paused = true)]
async fn set_viewport_applies_immediately_and_opens_window() {
    let mut map = controller();
    map.set_viewport(Coordinate::new(9.0, 9.0), 42.0);
    assert_eq!(map.viewport().center, Coordinate::new(9.0, 9.0));
    assert_eq!(map.viewport().zoom, 6.0);
    assert_eq!(
        map.follow_marker(Coordinate::new(1.0, 1.0)),
        FollowOutcome::Suppressed
    );
}

#[test]
fn initial_zoom_outside_bounds_is_clamped() {
    let map = MapViewController::new(MapViewSettings {
        initial_zoom: 30.0,
        ..MapViewSettings::default()
    });
    assert_eq!(map.viewport().zoom, 18.0);
}
