//! Remote order service.
//!
//! The remote service is the authoritative catalog and order log. It speaks
//! JSON over HTTP; any non-2xx answer is an error.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | GET | `/products` | [`RemoteService::fetch_products`] |
//! | POST | `/products` | [`RemoteService::add_product`] |
//! | DELETE | `/products` | [`RemoteService::remove_product`] |
//! | POST | `/orders` | [`RemoteService::submit_order`] |
//! | GET | `/orders` | [`RemoteService::fetch_orders`] |
//! | DELETE | `/orders/{id}` | [`RemoteService::remove_order`] |
//! | GET/POST | `/categories` | [`RemoteService::fetch_categories`], [`RemoteService::add_category`] |
//! | GET/POST | `/customerdata` | [`RemoteService::fetch_customer_data`], [`RemoteService::save_customer_data`] |

pub mod client;
#[cfg(any(test, feature = "testing"))]
pub mod fake;

use async_trait::async_trait;
use thiserror::Error;
use till_core::{Category, CustomerProfile, Money, Order, OrderId, Product};

pub use client::HttpRemote;
#[cfg(any(test, feature = "testing"))]
pub use fake::FakeRemote;

/// Where a read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Fresh from the remote service.
    Remote,
    /// From the local cache because the remote service was unreachable.
    Cache,
}

/// Errors that can occur when talking to the remote service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("HTTP error! Status: {status}, Endpoint: {endpoint}")]
    Status { status: u16, endpoint: String },

    /// The response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service could not be reached at all.
    #[error("remote service unreachable: {0}")]
    Unreachable(String),
}

/// Operations offered by the remote service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Fetch the full catalog.
    async fn fetch_products(&self) -> Result<Vec<Product>, TransportError>;

    /// Add a product to the catalog.
    async fn add_product(&self, product: &Product) -> Result<(), TransportError>;

    /// Remove every catalog product with this name and price.
    async fn remove_product(&self, name: &str, price: Money) -> Result<(), TransportError>;

    /// Submit an order.
    ///
    /// Any 2xx answer acknowledges the order. Returns the stored copy when
    /// the service echoes one back, otherwise the order as sent.
    async fn submit_order(&self, order: &Order) -> Result<Order, TransportError>;

    /// Fetch the full order log.
    async fn fetch_orders(&self) -> Result<Vec<Order>, TransportError>;

    /// Delete an order from the log.
    async fn remove_order(&self, id: &OrderId) -> Result<(), TransportError>;

    /// Fetch the catalog categories.
    async fn fetch_categories(&self) -> Result<Vec<Category>, TransportError>;

    /// Add a category.
    async fn add_category(&self, name: &str) -> Result<Category, TransportError>;

    /// Fetch stored customer profiles.
    async fn fetch_customer_data(&self) -> Result<Vec<CustomerProfile>, TransportError>;

    /// Store a customer profile.
    async fn save_customer_data(&self, profile: &CustomerProfile) -> Result<(), TransportError>;
}
