//! Delivery tracking core: query lifecycle, status machine, route projection
//! and map viewport synchronisation.

pub mod config;
pub mod dashboard;
pub mod feed;
pub mod map_view;
pub mod projector;
pub mod session;
pub mod status;

pub use dashboard::{Placeholder, TrackingDashboard, TrackingView};
pub use feed::{FixtureFeed, SimulatedFeed, TelemetryFeed};
pub use map_view::{FollowMode, FollowOutcome, MapViewController, MapViewSettings, Viewport};
pub use session::{
    ApplyOutcome, FetchHandle, Phase, RequestToken, SessionEvent, SessionState, SnapshotObserver,
    TrackingError, TrackingSession,
};
pub use status::{IllegalTransition, StatusDisplay, StatusMachine, Transition, TransitionKind};
