//! HTTP client for the remote order service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use till_core::{Category, CustomerProfile, Money, Order, OrderId, Product};
use tracing::{debug, instrument};
use url::Url;

use super::{RemoteService, TransportError};

/// `reqwest`-backed [`RemoteService`].
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpRemote {
    inner: Arc<HttpRemoteInner>,
}

struct HttpRemoteInner {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct ProductKey<'a> {
    name: &'a str,
    price: Money,
}

#[derive(Serialize)]
struct NewCategory<'a> {
    name: &'a str,
}

impl HttpRemote {
    /// Create a client for the service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(HttpRemoteInner { client, base_url }),
        })
    }

    /// The service base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Join an endpoint onto the base URL, keeping any base path.
    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}{endpoint}",
            self.inner.base_url.as_str().trim_end_matches('/')
        )
    }

    /// Send a request and return the body of a 2xx answer.
    async fn send_raw<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, TransportError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let mut request = self.inner.client.request(method.clone(), self.url(endpoint));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Unreachable(e.to_string())
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = response.status();
        debug!(%method, endpoint, status = status.as_u16(), "Remote call finished");
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Send a request and decode the JSON answer.
    async fn send<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, TransportError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.send_raw(method, endpoint, body).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Like [`send`](Self::send), but ignores the response body.
    async fn send_ignoring_body<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<(), TransportError>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send_raw(method, endpoint, body).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    #[instrument(skip(self))]
    async fn fetch_products(&self) -> Result<Vec<Product>, TransportError> {
        self.send::<(), _>(Method::GET, "/products", None).await
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn add_product(&self, product: &Product) -> Result<(), TransportError> {
        self.send_ignoring_body(Method::POST, "/products", Some(product))
            .await
    }

    #[instrument(skip(self))]
    async fn remove_product(&self, name: &str, price: Money) -> Result<(), TransportError> {
        self.send_ignoring_body(Method::DELETE, "/products", Some(&ProductKey { name, price }))
            .await
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn submit_order(&self, order: &Order) -> Result<Order, TransportError> {
        let bytes = self.send_raw(Method::POST, "/orders", Some(order)).await?;
        // A 2xx status is the acknowledgment; the body is only informative.
        match serde_json::from_slice::<Order>(&bytes) {
            Ok(stored) => Ok(stored),
            Err(e) => {
                debug!(error = %e, "Order acknowledged without a stored copy");
                Ok(order.clone())
            }
        }
    }

    #[instrument(skip(self))]
    async fn fetch_orders(&self) -> Result<Vec<Order>, TransportError> {
        self.send::<(), _>(Method::GET, "/orders", None).await
    }

    #[instrument(skip(self))]
    async fn remove_order(&self, id: &OrderId) -> Result<(), TransportError> {
        self.send_ignoring_body::<()>(Method::DELETE, &format!("/orders/{id}"), None)
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<Category>, TransportError> {
        self.send::<(), _>(Method::GET, "/categories", None).await
    }

    #[instrument(skip(self))]
    async fn add_category(&self, name: &str) -> Result<Category, TransportError> {
        self.send(Method::POST, "/categories", Some(&NewCategory { name }))
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_customer_data(&self) -> Result<Vec<CustomerProfile>, TransportError> {
        self.send::<(), _>(Method::GET, "/customerdata", None).await
    }

    #[instrument(skip(self, profile))]
    async fn save_customer_data(&self, profile: &CustomerProfile) -> Result<(), TransportError> {
        self.send_ignoring_body(Method::POST, "/customerdata", Some(profile))
            .await
    }
}
