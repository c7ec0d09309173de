//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! till migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TILL_DATABASE_URL` - `SQLite` connection string (default `sqlite://till.db`)
//!
//! # Migration Files
//!
//! Migrations are embedded from `crates/pos/migrations/` and also run
//! whenever the store is opened, so this command only needs to be run to
//! prepare a database ahead of time.

use till_pos::store::SqliteStore;

use super::CommandError;

/// Create the database if needed and apply pending migrations.
///
/// # Errors
///
/// Returns `CommandError::Store` if the database cannot be opened or
/// migrated.
pub async fn run(database_url: &str) -> Result<(), CommandError> {
    if database_url == "memory:" {
        tracing::info!("In-memory store has nothing to migrate");
        return Ok(());
    }

    tracing::info!("Running migrations...");
    SqliteStore::open(database_url).await?;
    tracing::info!(database = %database_url, "Migrations complete!");
    Ok(())
}
