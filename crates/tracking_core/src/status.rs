//! Delivery status ordering and its display mapping.

use serde::Serialize;
use shared::domain::OrderStatus;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Same status reported again.
    Refreshed,
    /// Moved to the next status.
    Advanced,
    /// Incoming status was behind the current one and was ignored.
    Clamped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: OrderStatus,
    pub kind: TransitionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal status transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IconKind {
    Package,
    Truck,
    CheckCircle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorKind {
    Amber,
    Blue,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub icon: IconKind,
    pub color: ColorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub label: &'static str,
    pub reached: bool,
}

pub struct StatusMachine;

impl StatusMachine {
    /// Any status may be the first one reported for an order.
    pub fn initial(incoming: OrderStatus) -> Transition {
        Transition {
            status: incoming,
            kind: TransitionKind::Advanced,
        }
    }

    pub fn next(status: OrderStatus) -> Option<OrderStatus> {
        match status {
            OrderStatus::Preparing => Some(OrderStatus::OnWay),
            OrderStatus::OnWay => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    /// Applies `incoming` on top of `current`.
    ///
    /// Backward moves are clamped to `current` rather than rejected, since
    /// transports may redeliver or reorder status updates. Forward jumps that
    /// skip a state are rejected.
    pub fn advance(
        current: OrderStatus,
        incoming: OrderStatus,
    ) -> Result<Transition, IllegalTransition> {
        if incoming == current {
            return Ok(Transition {
                status: current,
                kind: TransitionKind::Refreshed,
            });
        }
        if Self::next(current) == Some(incoming) {
            return Ok(Transition {
                status: incoming,
                kind: TransitionKind::Advanced,
            });
        }
        if incoming < current {
            warn!(
                from = %current,
                to = %incoming,
                "clamping out-of-order status update"
            );
            return Ok(Transition {
                status: current,
                kind: TransitionKind::Clamped,
            });
        }
        Err(IllegalTransition {
            from: current,
            to: incoming,
        })
    }

    pub fn display(status: OrderStatus) -> StatusDisplay {
        match status {
            OrderStatus::Preparing => StatusDisplay {
                label: "Preparing",
                icon: IconKind::Package,
                color: ColorKind::Amber,
            },
            OrderStatus::OnWay => StatusDisplay {
                label: "On the way",
                icon: IconKind::Truck,
                color: ColorKind::Blue,
            },
            OrderStatus::Delivered => StatusDisplay {
                label: "Delivered",
                icon: IconKind::CheckCircle,
                color: ColorKind::Green,
            },
        }
    }

    /// Steps of the delivery progress bar.
    pub fn milestones(status: OrderStatus) -> [Milestone; 3] {
        [
            Milestone {
                label: "Order Placed",
                reached: true,
            },
            Milestone {
                label: "In Transit",
                reached: status >= OrderStatus::OnWay,
            },
            Milestone {
                label: "Delivered",
                reached: status == OrderStatus::Delivered,
            },
        ]
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
