//! Status enums for orders and queued submissions.

use serde::{Deserialize, Serialize};

/// How an order is fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    /// Sent out to the customer's address.
    #[default]
    Delivery,
    /// Served at a table.
    DineIn,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivery => write!(f, "delivery"),
            Self::DineIn => write!(f, "dine-in"),
        }
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "dine-in" | "dinein" | "dine_in" => Ok(Self::DineIn),
            _ => Err(format!("invalid order type: {s}")),
        }
    }
}

/// Lifecycle of a captured order with respect to the remote service.
///
/// ```text
/// Captured -> Acked                        (direct submission succeeded)
/// Captured -> Queued                       (direct submission failed)
/// Queued   -> Syncing -> Acked             (replayed; entry removed)
/// Queued   -> Syncing -> Failed -> Queued  (replay failed; retried next pass)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Frozen from the cart, not yet sent.
    Captured,
    /// Durably held in the offline queue.
    Queued,
    /// Being replayed by a reconciliation pass.
    Syncing,
    /// Acknowledged by the remote service. Terminal.
    Acked,
    /// Last replay attempt failed; still queued.
    Failed,
}

impl QueueState {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Captured, Self::Acked | Self::Queued)
                | (Self::Queued, Self::Syncing)
                | (Self::Syncing, Self::Acked | Self::Failed)
                | (Self::Failed, Self::Queued)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Acked)
    }
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Captured => write!(f, "captured"),
            Self::Queued => write!(f, "queued"),
            Self::Syncing => write!(f, "syncing"),
            Self::Acked => write!(f, "acked"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
