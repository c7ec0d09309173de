//! Local persistent store.
//!
//! A collection-scoped record store that keeps the cart, the catalog cache and
//! the offline order queue across restarts and network loss. Callers only see
//! the [`LocalStore`] capability set; the medium behind it is either `SQLite`
//! ([`SqliteStore`]) or process memory ([`MemoryStore`]).
//!
//! # Collections
//!
//! - `products` - catalog cache
//! - `cart` - in-progress order lines, keyed by position
//! - `orders` - offline submission queue
//! - `order_history` - cache of orders confirmed by the remote service
//! - `categories` - catalog categories cache
//! - `customers` - customer profile cache
//! - `kot` - kitchen order tickets
//!
//! # Error semantics
//!
//! Read paths degrade: [`load_or_empty`] logs and returns an empty list when
//! the medium is unavailable. Write paths never swallow errors.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying medium cannot be opened or reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A record body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Named record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Cart,
    Orders,
    OrderHistory,
    Categories,
    Customers,
    Kot,
}

impl Collection {
    /// Every collection, in a stable order.
    pub const ALL: [Self; 7] = [
        Self::Products,
        Self::Cart,
        Self::Orders,
        Self::OrderHistory,
        Self::Categories,
        Self::Customers,
        Self::Kot,
    ];

    /// Storage name of the collection.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Cart => "cart",
            Self::Orders => "orders",
            Self::OrderHistory => "order_history",
            Self::Categories => "categories",
            Self::Customers => "customers",
            Self::Kot => "kot",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

/// One stored record: an id unique within its collection and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub body: serde_json::Value,
}

impl StoredRecord {
    /// Encode a value as a record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the value cannot be encoded.
    pub fn encode<T: Serialize>(id: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            body: serde_json::to_value(value)?,
        })
    }

    /// Decode the record body.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Capability set of the local persistent store.
///
/// Operations on different collections never wait on each other beyond what
/// the medium requires. `save_items` is a snapshot overwrite of the whole
/// collection and is atomic: readers see either the old or the new contents.
///
/// # Implementations
///
/// - `SqliteStore`: durable `SQLite` storage
/// - `MemoryStore`: in-process storage for tests and ephemeral sessions
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Get one record by id.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>>;

    /// All records of a collection in insertion order; empty if absent.
    async fn get_all(&self, collection: Collection) -> Result<Vec<StoredRecord>>;

    /// Replace the full contents of a collection.
    ///
    /// If `records` repeats an id, the last occurrence wins.
    async fn save_items(&self, collection: Collection, records: Vec<StoredRecord>) -> Result<()>;

    /// Upsert records: existing ids keep their position, new ids are appended.
    async fn put_items(&self, collection: Collection, records: Vec<StoredRecord>) -> Result<()>;

    /// Remove exactly one record; no-op if absent.
    async fn delete_item(&self, collection: Collection, id: &str) -> Result<()>;

    /// Empty a collection.
    async fn clear_store(&self, collection: Collection) -> Result<()>;
}

/// Open the store named by `database_url`.
///
/// `memory:` opens a [`MemoryStore`]; anything else is handed to
/// [`SqliteStore::open`].
///
/// # Errors
///
/// Returns `StoreError::Unavailable` if the medium cannot be opened.
pub async fn open(database_url: &str) -> Result<Arc<dyn LocalStore>> {
    if database_url == "memory:" {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(SqliteStore::open(database_url).await?))
}

/// Load and decode every record of a collection.
///
/// Records that fail to decode are skipped with a warning; they stay in the
/// store untouched.
///
/// # Errors
///
/// Returns the store error if the collection cannot be read.
pub async fn load<T: DeserializeOwned>(
    store: &dyn LocalStore,
    collection: Collection,
) -> Result<Vec<T>> {
    let records = store.get_all(collection).await?;
    Ok(records
        .iter()
        .filter_map(|record| match record.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%collection, id = %record.id, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect())
}

/// Like [`load`], but an unreadable collection is treated as empty.
pub async fn load_or_empty<T: DeserializeOwned>(
    store: &dyn LocalStore,
    collection: Collection,
) -> Vec<T> {
    match load(store, collection).await {
        Ok(values) => values,
        Err(e) => {
            warn!(%collection, error = %e, "Store read failed, treating collection as empty");
            Vec::new()
        }
    }
}

/// Overwrite a collection with `values`, keyed by `key`.
///
/// # Errors
///
/// Returns the store error if encoding or writing fails.
pub async fn save_all<T, F>(
    store: &dyn LocalStore,
    collection: Collection,
    values: &[T],
    key: F,
) -> Result<()>
where
    T: Serialize + Sync,
    F: Fn(usize, &T) -> String + Send,
{
    let records = values
        .iter()
        .enumerate()
        .map(|(index, value)| StoredRecord::encode(key(index, value), value))
        .collect::<Result<Vec<_>>>()?;
    store.save_items(collection, records).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(collection.name().parse::<Collection>().unwrap(), collection);
        }
        assert!("receipts".parse::<Collection>().is_err());
    }

    #[test]
    fn test_record_encode_decode() {
        let record = StoredRecord::encode("1", &vec![1, 2, 3]).unwrap();
        assert_eq!(record.decode::<Vec<i32>>().unwrap(), vec![1, 2, 3]);
        assert!(record.decode::<String>().is_err());
    }

    #[tokio::test]
    async fn test_load_skips_malformed_records() {
        let store = MemoryStore::new();
        store
            .save_items(
                Collection::Categories,
                vec![
                    StoredRecord::encode("a", &"Pizza").unwrap(),
                    StoredRecord::encode("b", &42).unwrap(),
                ],
            )
            .await
            .unwrap();

        let names: Vec<String> = load(&store, Collection::Categories).await.unwrap();
        assert_eq!(names, vec!["Pizza".to_string()]);
    }

    #[tokio::test]
    async fn test_load_or_empty_degrades_when_unavailable() {
        let store = MemoryStore::new();
        save_all(&store, Collection::Categories, &["Pizza"], |i, _| i.to_string())
            .await
            .unwrap();
        store.set_unavailable(true).await;

        let names: Vec<String> = load_or_empty(&store, Collection::Categories).await;
        assert!(names.is_empty());
    }
}
