//! Integration tests for Till.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p till-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_consolidation` - cart building and persistence across restarts
//! - `offline_sync` - offline capture, queue durability and reconciliation
//! - `sqlite_store` - the `SQLite` store against the store contract
//! - `http_remote` - the HTTP client against a local mock order service
//!
//! Most tests run against a scripted [`FakeRemote`]. `http_remote` starts a
//! `wiremock` server on localhost; nothing here needs an outside service.

use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;
use till_core::{LocalId, Money, Product, ProductId, Variety};
use till_pos::config::FeatureGrant;
use till_pos::remote::FakeRemote;
use till_pos::store::{LocalStore, MemoryStore, SqliteStore, StoreError};
use till_pos::Register;

/// A register wired to a scripted remote, with handles to both sides.
pub struct TestTill {
    pub store: Arc<dyn LocalStore>,
    pub remote: Arc<FakeRemote>,
    pub register: Register,
    grant: FeatureGrant,
}

impl TestTill {
    /// Till over a fresh in-memory store.
    pub async fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), FeatureGrant::basic()).await
    }

    /// Till over a fresh in-memory `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns the store error if the database cannot be created.
    pub async fn sqlite() -> Result<Self, StoreError> {
        let store = SqliteStore::in_memory().await?;
        Ok(Self::with_store(Arc::new(store), FeatureGrant::basic()).await)
    }

    /// Till over `store`, with the sample menu on the remote.
    pub async fn with_store(store: Arc<dyn LocalStore>, grant: FeatureGrant) -> Self {
        let remote = Arc::new(FakeRemote::new().with_products(menu()));
        let register = Register::with_parts(store.clone(), remote.clone(), grant, gst()).await;
        Self {
            store,
            remote,
            register,
            grant,
        }
    }

    /// A fresh register over the same store and remote, as after a restart.
    pub async fn restart(&self) -> Register {
        Register::with_parts(self.store.clone(), self.remote.clone(), self.grant, gst()).await
    }
}

/// GST rate used by every test till.
#[must_use]
pub fn gst() -> Decimal {
    Decimal::from(5)
}

/// Sample catalog.
#[must_use]
pub fn menu() -> Vec<Product> {
    vec![
        Product::plain(ProductId::new(1), "Garlic Bread", Money::from_major(120))
            .in_category("Extra"),
        Product::plain(ProductId::new(2), "Coke", Money::from_major(60)),
        Product::with_varieties(
            ProductId::new(7),
            "Farmhouse",
            vec![
                Variety::new("M", Money::from_major(300)),
                Variety::new("L", Money::from_major(450)),
            ],
        )
        .in_category("Pizza"),
    ]
}

/// Look up a product of [`menu`] by id.
#[must_use]
pub fn product(id: i64) -> Option<Product> {
    menu().into_iter().find(|p| p.id == ProductId::new(id))
}

/// A database file under the system temp directory, removed on drop.
pub struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    #[must_use]
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("till-test-{}.db", LocalId::generate()));
        Self { path }
    }

    /// Connection URL for [`SqliteStore::open`].
    #[must_use]
    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Default for TempDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}
