//! CLI command implementations.

pub mod cart;
pub mod catalog;
pub mod history;
pub mod migrate;
pub mod orders;

use thiserror::Error;
use till_pos::store::StoreError;
use till_pos::{Register, TillConfig, TillError};

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The till reported an error.
    #[error("{}", .0.user_message())]
    Till(#[from] TillError),

    /// The local database could not be prepared.
    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    /// The command line named something that does not exist.
    #[error("{0}")]
    NotFound(String),
}

/// Open the till described by `config`.
///
/// # Errors
///
/// Returns `CommandError::Till` if the store or remote cannot be set up.
pub async fn open(config: &TillConfig) -> Result<Register, CommandError> {
    Ok(Register::open(config).await?)
}
