use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Unavailable,
    Timeout,
    InvalidData,
    Internal,
}

/// Failure reported by a telemetry collaborator for one lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct FeedError {
    pub code: ErrorCode,
    pub message: String,
}

impl FeedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(tracking_id: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("no delivery found for tracking id {tracking_id}"),
        )
    }
}

/// Data errors raised while constructing domain values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("tracking id must not be empty")]
    EmptyTrackingId,
    #[error("route needs at least 2 waypoints, got {count}")]
    InvalidRoute { count: usize },
    #[error("progress must be within 0..=100, got {0}")]
    ProgressOutOfRange(u32),
    #[error("vehicle speed must be a finite non-negative number, got {0}")]
    InvalidSpeed(f64),
}

impl From<DomainError> for FeedError {
    fn from(value: DomainError) -> Self {
        Self::new(ErrorCode::InvalidData, value.to_string())
    }
}
