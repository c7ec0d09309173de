//! Unified error type for order-capture operations.
//!
//! Every operation in this crate returns `Result<T, TillError>`. None of the
//! variants is fatal: transport failures are recovered by the cache and queue
//! fallbacks, the rest are surfaced to the operator as a notice.

use thiserror::Error;
use till_core::PhoneError;

use crate::remote::TransportError;
use crate::store::StoreError;

/// Errors surfaced by the order-capture core.
#[derive(Debug, Error)]
pub enum TillError {
    /// The remote service is unreachable or answered non-2xx.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The local store could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The caller lacks the capability for this operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The operation was rejected before any state changed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<PhoneError> for TillError {
    fn from(err: PhoneError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl TillError {
    /// Whether the caller can carry on after this error.
    ///
    /// Transport failures are covered by the cache and queue. Storage write
    /// failures are not: data the operator entered was not persisted.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }

    /// Short notice suitable for showing to the operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => {
                "Server unreachable. Working offline; orders will be synced later.".to_string()
            }
            Self::Storage(_) => "Could not save to this device. Please try again.".to_string(),
            Self::PermissionDenied(_) => {
                "This feature is not enabled. Upgrade to use it.".to_string()
            }
            Self::Validation(msg) | Self::NotFound(msg) => msg.clone(),
        }
    }
}

/// Result type alias for `TillError`.
pub type Result<T> = std::result::Result<T, TillError>;
