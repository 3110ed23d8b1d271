//! Telemetry collaborators the session fetches order snapshots from.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::{
    domain::{
        Coordinate, DeliveryDetails, Driver, OrderSnapshot, OrderStatus, Route, TrackingId,
        Vehicle, Waypoint,
    },
    error::FeedError,
    protocol::FixtureFile,
};
use tracing::{debug, info};

use crate::session::RequestToken;

#[async_trait]
pub trait TelemetryFeed: Send + Sync {
    /// Looks up the current state of `id`. `token` identifies the request for
    /// correlation only; callers discard responses for superseded tokens.
    async fn fetch_order(
        &self,
        id: &TrackingId,
        token: RequestToken,
    ) -> Result<OrderSnapshot, FeedError>;
}

const DEFAULT_MAX_TRACKED_IDS: usize = 1024;

/// Sample fuel order served for any tracking id, moving forward by
/// `progress_step` on each poll of the same id.
///
/// At most `max_tracked_ids` poll counters are kept. Delivered ids are
/// forgotten first when room is needed.
pub struct SimulatedFeed {
    latency: Duration,
    start_progress: u8,
    progress_step: u8,
    max_tracked_ids: usize,
    polls: Mutex<HashMap<TrackingId, u32>>,
}

impl SimulatedFeed {
    pub fn new(latency: Duration, progress_step: u8) -> Self {
        Self {
            latency,
            start_progress: 65,
            progress_step,
            max_tracked_ids: DEFAULT_MAX_TRACKED_IDS,
            polls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_start_progress(mut self, progress: u8) -> Self {
        self.start_progress = progress.min(OrderSnapshot::MAX_PROGRESS);
        self
    }

    pub fn with_max_tracked_ids(mut self, max: usize) -> Self {
        self.max_tracked_ids = max.max(1);
        self
    }

    fn progress_after(&self, polls: u32) -> u32 {
        u32::from(self.start_progress)
            .saturating_add(polls.saturating_mul(u32::from(self.progress_step)))
            .min(u32::from(OrderSnapshot::MAX_PROGRESS))
    }

    fn next_progress(&self, id: &TrackingId) -> u32 {
        let mut polls = self.polls.lock().unwrap_or_else(PoisonError::into_inner);
        if !polls.contains_key(id) && polls.len() >= self.max_tracked_ids {
            let delivered = u32::from(OrderSnapshot::MAX_PROGRESS);
            polls.retain(|_, count| self.progress_after(*count) < delivered);
            if polls.len() >= self.max_tracked_ids {
                debug!(tracked = polls.len(), "poll counters full, starting over");
                polls.clear();
            }
        }
        let count = polls.entry(id.clone()).or_insert(0);
        let progress = self.progress_after(*count);
        *count = count.saturating_add(1);
        progress
    }

    #[cfg(test)]
    fn tracked_ids(&self) -> usize {
        self.polls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub fn status_for_progress(progress: u32) -> OrderStatus {
    match progress {
        0 => OrderStatus::Preparing,
        p if p >= u32::from(OrderSnapshot::MAX_PROGRESS) => OrderStatus::Delivered,
        _ => OrderStatus::OnWay,
    }
}

/// The demo order displayed by the dashboard.
pub fn sample_order(
    id: TrackingId,
    status: OrderStatus,
    progress: u32,
) -> Result<OrderSnapshot, FeedError> {
    let route = Route::new(vec![
        Waypoint::new(
            "09:00",
            "Fuel Depot Station",
            Coordinate::new(-73.9903, 40.7301),
        ),
        Waypoint::new("09:12", "Broadway & 14th", Coordinate::new(-73.9906, 40.7350)),
        Waypoint::new("09:20", "Park Ave South", Coordinate::new(-73.9855, 40.7401)),
        Waypoint::new("09:30", "123 Main Street", Coordinate::new(-73.9800, 40.7452)),
    ])?;
    let vehicle = Vehicle::new("Fuel Tanker FT-204", 32.0)?;
    let snapshot = OrderSnapshot::new(id, status, progress, route, vehicle)?.with_details(
        DeliveryDetails {
            eta_label: None,
            location_label: None,
            origin_label: Some("Fuel Depot Station".into()),
            destination_label: Some("123 Main Street".into()),
            product: Some("Regular Unleaded".into()),
            quantity: Some("35 Liters".into()),
            driver: Some(Driver {
                name: "Michael Johnson".into(),
                phone: "+1 (555) 123-4567".into(),
            }),
        },
    );
    Ok(snapshot)
}

#[async_trait]
impl TelemetryFeed for SimulatedFeed {
    async fn fetch_order(
        &self,
        id: &TrackingId,
        token: RequestToken,
    ) -> Result<OrderSnapshot, FeedError> {
        tokio::time::sleep(self.latency).await;
        let progress = self.next_progress(id);
        debug!(tracking_id = %id, token, progress, "simulated telemetry reading");
        sample_order(id.clone(), status_for_progress(progress), progress)
    }
}

/// Serves orders from a JSON fixture; unknown ids are `NotFound`.
pub struct FixtureFeed {
    latency: Duration,
    orders: HashMap<TrackingId, OrderSnapshot>,
}

impl FixtureFeed {
    pub fn from_fixture(fixture: FixtureFile, latency: Duration) -> Result<Self> {
        let mut orders = HashMap::new();
        for payload in fixture.orders {
            let id = payload.id.clone();
            let snapshot = OrderSnapshot::try_from(payload)
                .with_context(|| format!("invalid fixture order {id:?}"))?;
            orders.insert(snapshot.tracking_id.clone(), snapshot);
        }
        Ok(Self { latency, orders })
    }

    pub fn load(path: &Path, latency: Duration) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        let fixture: FixtureFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse fixture {}", path.display()))?;
        let feed = Self::from_fixture(fixture, latency)?;
        info!(path = %path.display(), orders = feed.orders.len(), "loaded telemetry fixture");
        Ok(feed)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl TelemetryFeed for FixtureFeed {
    async fn fetch_order(
        &self,
        id: &TrackingId,
        token: RequestToken,
    ) -> Result<OrderSnapshot, FeedError> {
        tokio::time::sleep(self.latency).await;
        debug!(tracking_id = %id, token, "fixture lookup");
        self.orders
            .get(id)
            .cloned()
            .ok_or_else(|| FeedError::not_found(id.as_str()))
    }
}

#[cfg(test)]
#[path = "tests/feed_tests.rs"]
mod tests;
