//! Read model and command surface for the live tracking screen.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use shared::domain::{Coordinate, OrderSnapshot};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    config::Settings,
    feed::TelemetryFeed,
    map_view::{FollowMode, MapViewController, MapViewSettings, Viewport},
    projector::{self, Projection},
    session::{FetchHandle, Phase, SessionEvent, SnapshotObserver, TrackingError, TrackingSession},
    status::{Milestone, StatusDisplay, StatusMachine},
};

type SharedMap = Arc<Mutex<MapViewController>>;

fn lock_map(map: &SharedMap) -> MutexGuard<'_, MapViewController> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Moves the map to each accepted snapshot's projected position.
struct MarkerFollower {
    map: SharedMap,
}

impl SnapshotObserver for MarkerFollower {
    fn snapshot_applied(&self, snapshot: &OrderSnapshot) {
        let projection = projector::project(&snapshot.route, f64::from(snapshot.progress));
        let outcome = lock_map(&self.map).follow_marker(projection.coordinate);
        debug!(
            tracking_id = %snapshot.tracking_id,
            segment = projection.segment_index,
            ?outcome,
            "marker moved"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placeholder {
    Skeleton,
    Retry { message: String },
    NoActiveDelivery,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub phase: Phase,
    pub query: Option<String>,
    pub snapshot: Option<OrderSnapshot>,
    pub viewport: Viewport,
    pub follow_mode: FollowMode,
    pub marker: Option<Projection>,
    pub display: Option<StatusDisplay>,
    pub milestones: Option<[Milestone; 3]>,
    pub eta_label: Option<String>,
    pub distance_label: Option<String>,
    pub placeholder: Option<Placeholder>,
}

pub struct TrackingDashboard {
    session: TrackingSession,
    map: SharedMap,
}

impl TrackingDashboard {
    pub fn new(feed: Arc<dyn TelemetryFeed>, map_settings: MapViewSettings) -> Self {
        let map = Arc::new(Mutex::new(MapViewController::new(map_settings)));
        let follower = Arc::new(MarkerFollower {
            map: Arc::clone(&map),
        });
        Self {
            session: TrackingSession::new_with_observer(feed, follower),
            map,
        }
    }

    pub fn from_settings(feed: Arc<dyn TelemetryFeed>, settings: &Settings) -> Self {
        Self::new(feed, settings.map_view_settings(Coordinate::new(0.0, 0.0)))
    }

    pub fn submit(&self, query: &str) -> Result<FetchHandle, TrackingError> {
        self.session.submit(query)
    }

    pub fn refresh(&self) -> Result<FetchHandle, TrackingError> {
        self.session.refresh()
    }

    pub fn reset(&self) {
        self.session.reset();
    }

    pub fn zoom_in(&self) -> f64 {
        lock_map(&self.map).zoom_in()
    }

    pub fn zoom_out(&self) -> f64 {
        lock_map(&self.map).zoom_out()
    }

    pub fn set_viewport(&self, center: Coordinate, zoom: f64) {
        lock_map(&self.map).set_viewport(center, zoom);
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe_events()
    }

    pub fn view(&self) -> TrackingView {
        let state = self.session.state();
        let (viewport, follow_mode) = {
            let map = lock_map(&self.map);
            (map.viewport(), map.follow_mode())
        };
        let snapshot = state.snapshot().cloned();

        let placeholder = match state.phase() {
            Phase::Loading => Some(Placeholder::Skeleton),
            Phase::Failed => Some(Placeholder::Retry {
                message: state
                    .last_error()
                    .map(|err| err.message.clone())
                    .unwrap_or_else(|| "tracking lookup failed".to_string()),
            }),
            Phase::Idle if snapshot.is_none() => Some(Placeholder::NoActiveDelivery),
            Phase::Idle | Phase::Ready => None,
        };

        let (marker, display, milestones, eta_label, distance_label) = match &snapshot {
            Some(order) => {
                let progress = f64::from(order.progress);
                let eta_label = order.details.eta_label.clone().or_else(|| {
                    projector::estimated_minutes_remaining(&order.route, progress, &order.vehicle)
                        .map(|minutes| format!("{minutes} min"))
                });
                let distance_label = order.details.location_label.clone().or_else(|| {
                    let km = projector::remaining_distance_km(&order.route, progress);
                    Some(format!("{km:.1} km away"))
                });
                (
                    Some(projector::project(&order.route, progress)),
                    Some(StatusMachine::display(order.status)),
                    Some(StatusMachine::milestones(order.status)),
                    eta_label,
                    distance_label,
                )
            }
            None => (None, None, None, None, None),
        };

        TrackingView {
            phase: state.phase(),
            query: state.query().map(str::to_string),
            snapshot,
            viewport,
            follow_mode,
            marker,
            display,
            milestones,
            eta_label,
            distance_label,
            placeholder,
        }
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
