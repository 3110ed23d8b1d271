use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Opaque identifier of a tracked delivery, e.g. `TRK-78945`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingId(String);

impl TrackingId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyTrackingId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TrackingId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TrackingId> for String {
    fn from(value: TrackingId) -> Self {
        value.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `(lng, lat)` pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Linear interpolation; `t == 0.0` returns `self` bit-for-bit.
    pub fn lerp(self, other: Coordinate, t: f64) -> Coordinate {
        Coordinate {
            lng: self.lng + (other.lng - self.lng) * t,
            lat: self.lat + (other.lat - self.lat) * t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub timestamp_label: String,
    pub location: String,
    pub coordinate: Coordinate,
}

impl Waypoint {
    pub fn new(
        timestamp_label: impl Into<String>,
        location: impl Into<String>,
        coordinate: Coordinate,
    ) -> Self {
        Self {
            timestamp_label: timestamp_label.into(),
            location: location.into(),
            coordinate,
        }
    }
}

/// Ordered, immutable path of an order from origin to destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Waypoint>", into = "Vec<Waypoint>")]
pub struct Route {
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub const MIN_WAYPOINTS: usize = 2;

    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self, DomainError> {
        if waypoints.len() < Self::MIN_WAYPOINTS {
            return Err(DomainError::InvalidRoute {
                count: waypoints.len(),
            });
        }
        Ok(Self { waypoints })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn origin(&self) -> &Waypoint {
        &self.waypoints[0]
    }

    pub fn destination(&self) -> &Waypoint {
        &self.waypoints[self.waypoints.len() - 1]
    }
}

impl TryFrom<Vec<Waypoint>> for Route {
    type Error = DomainError;

    fn try_from(value: Vec<Waypoint>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Route> for Vec<Waypoint> {
    fn from(value: Route) -> Self {
        value.waypoints
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Preparing,
    OnWay,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Preparing,
        OrderStatus::OnWay,
        OrderStatus::Delivered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Preparing => "preparing",
            OrderStatus::OnWay => "on-way",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VehicleRecord")]
pub struct Vehicle {
    pub label: String,
    pub speed_kmh: f64,
}

impl Vehicle {
    pub fn new(label: impl Into<String>, speed_kmh: f64) -> Result<Self, DomainError> {
        check_speed(speed_kmh)?;
        Ok(Self {
            label: label.into(),
            speed_kmh,
        })
    }
}

fn check_speed(speed_kmh: f64) -> Result<(), DomainError> {
    if !speed_kmh.is_finite() || speed_kmh < 0.0 {
        return Err(DomainError::InvalidSpeed(speed_kmh));
    }
    Ok(())
}

#[derive(Deserialize)]
struct VehicleRecord {
    label: String,
    speed_kmh: f64,
}

impl TryFrom<VehicleRecord> for Vehicle {
    type Error = DomainError;

    fn try_from(value: VehicleRecord) -> Result<Self, Self::Error> {
        Self::new(value.label, value.speed_kmh)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub name: String,
    pub phone: String,
}

/// Presentation details a feed may attach to an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub eta_label: Option<String>,
    pub location_label: Option<String>,
    pub origin_label: Option<String>,
    pub destination_label: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<String>,
    pub driver: Option<Driver>,
}

/// One consistent reading of an order's delivery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OrderSnapshotRecord")]
pub struct OrderSnapshot {
    pub tracking_id: TrackingId,
    pub status: OrderStatus,
    pub progress: u8,
    pub route: Route,
    pub vehicle: Vehicle,
    #[serde(default)]
    pub details: DeliveryDetails,
}

impl OrderSnapshot {
    pub const MAX_PROGRESS: u8 = 100;

    pub fn new(
        tracking_id: TrackingId,
        status: OrderStatus,
        progress: u32,
        route: Route,
        vehicle: Vehicle,
    ) -> Result<Self, DomainError> {
        let progress = u8::try_from(progress)
            .ok()
            .filter(|value| *value <= Self::MAX_PROGRESS)
            .ok_or(DomainError::ProgressOutOfRange(progress))?;
        Ok(Self {
            tracking_id,
            status,
            progress,
            route,
            vehicle,
            details: DeliveryDetails::default(),
        })
    }

    pub fn with_details(mut self, details: DeliveryDetails) -> Self {
        self.details = details;
        self
    }

    /// Re-checks the bounds `new` enforces, for values built through the public fields.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.progress > Self::MAX_PROGRESS {
            return Err(DomainError::ProgressOutOfRange(u32::from(self.progress)));
        }
        check_speed(self.vehicle.speed_kmh)
    }
}

#[derive(Deserialize)]
struct OrderSnapshotRecord {
    tracking_id: TrackingId,
    status: OrderStatus,
    progress: u32,
    route: Route,
    vehicle: Vehicle,
    #[serde(default)]
    details: DeliveryDetails,
}

impl TryFrom<OrderSnapshotRecord> for OrderSnapshot {
    type Error = DomainError;

    fn try_from(value: OrderSnapshotRecord) -> Result<Self, Self::Error> {
        Ok(Self::new(
            value.tracking_id,
            value.status,
            value.progress,
            value.route,
            value.vehicle,
        )?
        .with_details(value.details))
    }
}
