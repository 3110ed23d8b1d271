use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        Coordinate, DeliveryDetails, Driver, OrderSnapshot, OrderStatus, Route, TrackingId,
        Vehicle, Waypoint,
    },
    error::DomainError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointPayload {
    pub timestamp: String,
    pub location: String,
    /// `[lng, lat]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePayload {
    pub label: String,
    #[serde(default)]
    pub speed_kmh: f64,
}

/// Order record as served by a telemetry lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub id: String,
    pub status: OrderStatus,
    pub progress: u32,
    pub route: Vec<WaypointPayload>,
    pub vehicle: VehiclePayload,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_phone: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub orders: Vec<OrderPayload>,
}

impl From<WaypointPayload> for Waypoint {
    fn from(value: WaypointPayload) -> Self {
        let [lng, lat] = value.coordinates;
        Waypoint::new(value.timestamp, value.location, Coordinate::new(lng, lat))
    }
}

impl TryFrom<OrderPayload> for OrderSnapshot {
    type Error = DomainError;

    fn try_from(value: OrderPayload) -> Result<Self, Self::Error> {
        let tracking_id = TrackingId::new(value.id)?;
        let route = Route::new(value.route.into_iter().map(Waypoint::from).collect())?;
        let vehicle = Vehicle::new(value.vehicle.label, value.vehicle.speed_kmh)?;

        let driver = match (value.driver_name, value.driver_phone) {
            (Some(name), phone) => Some(Driver {
                name,
                phone: phone.unwrap_or_default(),
            }),
            (None, _) => None,
        };

        let snapshot =
            OrderSnapshot::new(tracking_id, value.status, value.progress, route, vehicle)?;
        Ok(snapshot.with_details(DeliveryDetails {
            eta_label: value.delivery_time,
            location_label: value.location,
            origin_label: value.origin,
            destination_label: value.destination,
            product: value.product,
            quantity: value.quantity,
            driver,
        }))
    }
}
