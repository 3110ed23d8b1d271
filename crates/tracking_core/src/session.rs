//! Tracking query lifecycle with token-gated result application.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use shared::{
    domain::{OrderSnapshot, OrderStatus, TrackingId},
    error::FeedError,
};
use thiserror::Error;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    feed::TelemetryFeed,
    status::{StatusMachine, TransitionKind},
};

pub type RequestToken = u64;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("enter a tracking id to search")]
    EmptyQuery,
    #[error("tracking lookups need a running tokio runtime")]
    NoRuntime,
    #[error("fetch task for request {token} did not complete: {reason}")]
    FetchTask { token: RequestToken, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged {
        token: RequestToken,
        phase: Phase,
    },
    SnapshotApplied {
        token: RequestToken,
        snapshot: OrderSnapshot,
    },
    FetchFailed {
        token: RequestToken,
        error: FeedError,
    },
    StaleDropped {
        token: RequestToken,
        current: RequestToken,
    },
    StatusAnomaly {
        tracking_id: TrackingId,
        kept: OrderStatus,
        incoming: OrderStatus,
    },
    ProgressAnomaly {
        tracking_id: TrackingId,
        kept: u8,
        incoming: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Failed,
    Stale,
}

/// Notified inside the token gate after every accepted snapshot.
///
/// Implementations must not call back into the session.
pub trait SnapshotObserver: Send + Sync {
    fn snapshot_applied(&self, snapshot: &OrderSnapshot);
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    query: Option<String>,
    phase: Phase,
    snapshot: Option<OrderSnapshot>,
    request_token: RequestToken,
    pending: Option<RequestToken>,
    last_error: Option<FeedError>,
}

impl SessionState {
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn snapshot(&self) -> Option<&OrderSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn request_token(&self) -> RequestToken {
        self.request_token
    }

    pub fn last_error(&self) -> Option<&FeedError> {
        self.last_error.as_ref()
    }
}

/// Handle to one in-flight lookup.
#[derive(Debug)]
pub struct FetchHandle {
    token: RequestToken,
    task: JoinHandle<ApplyOutcome>,
}

impl FetchHandle {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Waits for the lookup to resolve and reports what happened to its result.
    pub async fn settled(self) -> Result<ApplyOutcome, TrackingError> {
        let token = self.token;
        self.task.await.map_err(|err| TrackingError::FetchTask {
            token,
            reason: err.to_string(),
        })
    }
}

struct SessionShared {
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    observer: Option<Arc<dyn SnapshotObserver>>,
}

impl SessionShared {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Token check and state write happen under a single lock acquisition.
    fn apply(&self, token: RequestToken, result: Result<OrderSnapshot, FeedError>) -> ApplyOutcome {
        let mut state = self.lock_state();
        if state.pending != Some(token) {
            debug!(token, current = state.request_token, "dropping stale tracking response");
            self.emit(SessionEvent::StaleDropped {
                token,
                current: state.request_token,
            });
            return ApplyOutcome::Stale;
        }
        state.pending = None;

        let result = result.and_then(|incoming| match incoming.validate() {
            Ok(()) => Ok(incoming),
            Err(err) => Err(FeedError::from(err)),
        });
        match result {
            Ok(incoming) => {
                let snapshot = self.reconcile(state.snapshot.as_ref(), incoming);
                info!(
                    token,
                    tracking_id = %snapshot.tracking_id,
                    status = %snapshot.status,
                    progress = snapshot.progress,
                    "tracking snapshot applied"
                );
                state.snapshot = Some(snapshot.clone());
                state.phase = Phase::Ready;
                state.last_error = None;
                if let Some(observer) = &self.observer {
                    observer.snapshot_applied(&snapshot);
                }
                self.emit(SessionEvent::SnapshotApplied { token, snapshot });
                self.emit(SessionEvent::PhaseChanged {
                    token,
                    phase: Phase::Ready,
                });
                ApplyOutcome::Applied
            }
            Err(error) => {
                warn!(token, %error, "tracking lookup failed");
                state.snapshot = None;
                state.phase = Phase::Failed;
                state.last_error = Some(error.clone());
                self.emit(SessionEvent::FetchFailed { token, error });
                self.emit(SessionEvent::PhaseChanged {
                    token,
                    phase: Phase::Failed,
                });
                ApplyOutcome::Failed
            }
        }
    }

    fn reconcile(
        &self,
        previous: Option<&OrderSnapshot>,
        incoming: OrderSnapshot,
    ) -> OrderSnapshot {
        let mut accepted = incoming;
        let Some(previous) = previous.filter(|p| p.tracking_id == accepted.tracking_id) else {
            accepted.status = StatusMachine::initial(accepted.status).status;
            return accepted;
        };

        let kept_status = match StatusMachine::advance(previous.status, accepted.status) {
            Ok(transition) if transition.kind == TransitionKind::Clamped => {
                Some(transition.status)
            }
            Ok(_) => None,
            Err(err) => {
                // Step towards the reported status so a skipped state cannot wedge the order.
                let stepped = StatusMachine::next(previous.status).unwrap_or(previous.status);
                warn!(
                    tracking_id = %accepted.tracking_id,
                    %err,
                    stepped = %stepped,
                    "stepping one status instead of skipping"
                );
                Some(stepped)
            }
        };
        if let Some(kept) = kept_status {
            self.emit(SessionEvent::StatusAnomaly {
                tracking_id: accepted.tracking_id.clone(),
                kept,
                incoming: accepted.status,
            });
            accepted.status = kept;
        }

        if accepted.progress < previous.progress {
            warn!(
                tracking_id = %accepted.tracking_id,
                kept = previous.progress,
                incoming = accepted.progress,
                "clamping progress regression"
            );
            self.emit(SessionEvent::ProgressAnomaly {
                tracking_id: accepted.tracking_id.clone(),
                kept: previous.progress,
                incoming: accepted.progress,
            });
            accepted.progress = previous.progress;
        }
        accepted
    }

    fn invalidate(&self, state: &mut SessionState) -> RequestToken {
        state.request_token += 1;
        state.pending = None;
        state.request_token
    }
}

pub struct TrackingSession {
    feed: Arc<dyn TelemetryFeed>,
    shared: Arc<SessionShared>,
}

impl TrackingSession {
    pub fn new(feed: Arc<dyn TelemetryFeed>) -> Self {
        Self::build(feed, None)
    }

    pub fn new_with_observer(
        feed: Arc<dyn TelemetryFeed>,
        observer: Arc<dyn SnapshotObserver>,
    ) -> Self {
        Self::build(feed, Some(observer))
    }

    fn build(feed: Arc<dyn TelemetryFeed>, observer: Option<Arc<dyn SnapshotObserver>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            feed,
            shared: Arc::new(SessionShared {
                state: Mutex::new(SessionState::default()),
                events,
                observer,
            }),
        }
    }

    /// Starts a lookup for `query`, superseding any lookup still in flight.
    ///
    /// Must be called from within a tokio runtime; the fetch runs as a task.
    pub fn submit(&self, query: &str) -> Result<FetchHandle, TrackingError> {
        let tracking_id = TrackingId::new(query).map_err(|_| TrackingError::EmptyQuery)?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TrackingError::NoRuntime)?;

        let token = {
            let mut state = self.shared.lock_state();
            let token = self.shared.invalidate(&mut state);
            state.pending = Some(token);
            state.query = Some(tracking_id.to_string());
            state.phase = Phase::Loading;
            state.last_error = None;
            self.shared.emit(SessionEvent::PhaseChanged {
                token,
                phase: Phase::Loading,
            });
            token
        };
        info!(tracking_id = %tracking_id, token, "tracking lookup submitted");

        let feed = Arc::clone(&self.feed);
        let shared = Arc::clone(&self.shared);
        let task = runtime.spawn(async move {
            let result = feed.fetch_order(&tracking_id, token).await;
            shared.apply(token, result)
        });
        Ok(FetchHandle { token, task })
    }

    /// Polls the held query again.
    pub fn refresh(&self) -> Result<FetchHandle, TrackingError> {
        let query = self.shared.lock_state().query.clone();
        match query {
            Some(query) => self.submit(&query),
            None => Err(TrackingError::EmptyQuery),
        }
    }

    pub fn reset(&self) {
        let mut state = self.shared.lock_state();
        let token = self.shared.invalidate(&mut state);
        state.query = None;
        state.snapshot = None;
        state.last_error = None;
        state.phase = Phase::Idle;
        self.shared.emit(SessionEvent::PhaseChanged {
            token,
            phase: Phase::Idle,
        });
        info!(token, "tracking session reset");
    }

    pub fn current_snapshot(&self) -> Option<OrderSnapshot> {
        self.shared.lock_state().snapshot.clone()
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock_state().phase
    }

    pub fn request_token(&self) -> RequestToken {
        self.shared.lock_state().request_token
    }

    pub fn query(&self) -> Option<String> {
        self.shared.lock_state().query.clone()
    }

    pub fn last_error(&self) -> Option<FeedError> {
        self.shared.lock_state().last_error.clone()
    }

    /// Consistent copy of the whole session state.
    pub fn state(&self) -> SessionState {
        self.shared.lock_state().clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        // In-flight tasks keep the shared state alive; make sure they land as stale.
        let mut state = self.shared.lock_state();
        self.shared.invalidate(&mut state);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
