//! `SQLite`-backed `LocalStore` implementation.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::{debug, instrument};

use super::{Collection, LocalStore, Result, StoreError, StoredRecord};

/// Durable store backed by a `SQLite` database.
///
/// Every collection lives in the single `records` table. Writes that touch
/// more than one row run in a transaction, so a snapshot overwrite is never
/// observed half-applied.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `database_url` and run
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the database cannot be opened and
    /// `StoreError::Migration` if the schema cannot be brought up to date.
    #[instrument(skip_all)]
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database.
    ///
    /// Uses a single connection that is never recycled; each `SQLite`
    /// connection to `:memory:` would otherwise see its own empty database.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the database cannot be created or migrated.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running pending migrations on it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Migration` if a migration fails.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns `StoreError::Migration` if a migration fails.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    debug!("Local store migrations applied");
    Ok(())
}

fn position(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>> {
        let row: Option<(String, String)> = sqlx::query_as(
            r"
            SELECT record_id, body FROM records
            WHERE collection = ? AND record_id = ?
            ",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, body)| {
            Ok(StoredRecord {
                id,
                body: serde_json::from_str(&body)?,
            })
        })
        .transpose()
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<StoredRecord>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r"
            SELECT record_id, body FROM records
            WHERE collection = ?
            ORDER BY position
            ",
        )
        .bind(collection.name())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, body)| {
                Ok(StoredRecord {
                    id,
                    body: serde_json::from_str(&body)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, records), fields(collection = %collection, count = records.len()))]
    async fn save_items(&self, collection: Collection, records: Vec<StoredRecord>) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(collection.name())
            .execute(&mut *tx)
            .await?;

        for (index, record) in records.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO records (collection, record_id, position, body, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (collection, record_id) DO UPDATE
                SET position = excluded.position,
                    body = excluded.body,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(collection.name())
            .bind(&record.id)
            .bind(position(index))
            .bind(record.body.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, records), fields(collection = %collection, count = records.len()))]
    async fn put_items(&self, collection: Collection, records: Vec<StoredRecord>) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for record in &records {
            sqlx::query(
                r"
                INSERT INTO records (collection, record_id, position, body, updated_at)
                VALUES (
                    ?1, ?2,
                    (SELECT COALESCE(MAX(position), -1) + 1 FROM records WHERE collection = ?1),
                    ?3, ?4
                )
                ON CONFLICT (collection, record_id) DO UPDATE
                SET body = excluded.body,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(collection.name())
            .bind(&record.id)
            .bind(record.body.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_item(&self, collection: Collection, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM records WHERE collection = ? AND record_id = ?")
            .bind(collection.name())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_store(&self, collection: Collection) -> Result<()> {
        sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(collection.name())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rec(id: &str, body: serde_json::Value) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            body,
        }
    }

    #[tokio::test]
    async fn test_save_items_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let records = vec![rec("0", json!({"name": "Margherita"})), rec("1", json!([1, 2]))];

        store
            .save_items(Collection::Cart, records.clone())
            .await
            .unwrap();
        let first = store.get_all(Collection::Cart).await.unwrap();
        store.save_items(Collection::Cart, first).await.unwrap();

        assert_eq!(store.get_all(Collection::Cart).await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_save_items_replaces_previous_contents() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .save_items(Collection::Cart, vec![rec("0", json!(1)), rec("1", json!(2))])
            .await
            .unwrap();
        store
            .save_items(Collection::Cart, vec![rec("0", json!(3))])
            .await
            .unwrap();

        assert_eq!(
            store.get_all(Collection::Cart).await.unwrap(),
            vec![rec("0", json!(3))]
        );
    }

    #[tokio::test]
    async fn test_save_items_duplicate_ids_last_wins() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .save_items(
                Collection::Cart,
                vec![rec("a", json!(1)), rec("b", json!(2)), rec("a", json!(3))],
            )
            .await
            .unwrap();

        assert_eq!(
            store.get_all(Collection::Cart).await.unwrap(),
            vec![rec("b", json!(2)), rec("a", json!(3))]
        );
    }

    #[tokio::test]
    async fn test_put_items_keeps_insertion_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        for id in ["c", "a", "b"] {
            store
                .put_items(Collection::Orders, vec![rec(id, json!(id))])
                .await
                .unwrap();
        }
        store
            .put_items(Collection::Orders, vec![rec("a", json!("updated"))])
            .await
            .unwrap();

        let all = store.get_all(Collection::Orders).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(
            store.get(Collection::Orders, "a").await.unwrap().unwrap().body,
            json!("updated")
        );
    }

    #[tokio::test]
    async fn test_delete_and_clear_are_scoped() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .put_items(Collection::Orders, vec![rec("x", json!(1)), rec("y", json!(2))])
            .await
            .unwrap();
        store
            .put_items(Collection::Products, vec![rec("x", json!(3))])
            .await
            .unwrap();

        store.delete_item(Collection::Orders, "x").await.unwrap();
        store.delete_item(Collection::Orders, "missing").await.unwrap();
        assert_eq!(store.get_all(Collection::Orders).await.unwrap().len(), 1);
        assert!(store.get(Collection::Products, "x").await.unwrap().is_some());

        store.clear_store(Collection::Orders).await.unwrap();
        assert!(store.get_all(Collection::Orders).await.unwrap().is_empty());
        assert_eq!(store.get_all(Collection::Products).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_missing_directory_is_unavailable() {
        let result = SqliteStore::open("sqlite:///nonexistent-till-dir/sub/till.db").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
