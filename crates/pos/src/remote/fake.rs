//! Scripted in-memory remote service for tests.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use till_core::{Category, CustomerProfile, Money, Order, OrderId, Product};
use tokio::sync::Mutex;

use super::{RemoteService, TransportError};

/// In-memory stand-in for the remote service.
///
/// Starts online with empty data. Can be switched offline, told to reject
/// particular orders, or told to fail order-log fetches.
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

struct FakeState {
    online: bool,
    products: Vec<Product>,
    orders: Vec<Order>,
    categories: Vec<Category>,
    customers: Vec<CustomerProfile>,
    rejected_orders: HashSet<OrderId>,
    fail_order_fetches: bool,
    submit_attempts: Vec<OrderId>,
    submit_delay: Option<Duration>,
    next_server_id: u64,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRemote {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                online: true,
                products: Vec::new(),
                orders: Vec::new(),
                categories: Vec::new(),
                customers: Vec::new(),
                rejected_orders: HashSet::new(),
                fail_order_fetches: false,
                submit_attempts: Vec::new(),
                submit_delay: None,
                next_server_id: 1,
            }),
        }
    }

    /// Seed the catalog.
    #[must_use]
    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.state.get_mut().products = products;
        self
    }

    /// Switch connectivity. While offline every call fails as unreachable.
    pub async fn set_online(&self, online: bool) {
        self.state.lock().await.online = online;
    }

    /// Answer submissions of this order with a server error.
    pub async fn reject_order(&self, id: &OrderId) {
        self.state.lock().await.rejected_orders.insert(id.clone());
    }

    /// Stop rejecting this order.
    pub async fn accept_order(&self, id: &OrderId) {
        self.state.lock().await.rejected_orders.remove(id);
    }

    /// Make `fetch_orders` fail while submissions keep working.
    pub async fn fail_order_fetches(&self, fail: bool) {
        self.state.lock().await.fail_order_fetches = fail;
    }

    /// Hold each order submission for `delay` before answering.
    pub async fn delay_submissions(&self, delay: Duration) {
        self.state.lock().await.submit_delay = Some(delay);
    }

    /// Ids of every submission attempt, in call order.
    pub async fn submit_attempts(&self) -> Vec<OrderId> {
        self.state.lock().await.submit_attempts.clone()
    }

    /// The server-side order log.
    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.clone()
    }

    /// The server-side catalog.
    pub async fn products(&self) -> Vec<Product> {
        self.state.lock().await.products.clone()
    }
}

impl FakeState {
    fn ensure_online(&self) -> Result<(), TransportError> {
        if self.online {
            Ok(())
        } else {
            Err(TransportError::Unreachable("remote offline".into()))
        }
    }

    fn allocate_server_id(&mut self) -> String {
        let id = format!("srv-{:04}", self.next_server_id);
        self.next_server_id += 1;
        id
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn fetch_products(&self) -> Result<Vec<Product>, TransportError> {
        let state = self.state.lock().await;
        state.ensure_online()?;
        Ok(state.products.clone())
    }

    async fn add_product(&self, product: &Product) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;
        state.products.push(product.clone());
        Ok(())
    }

    async fn remove_product(&self, name: &str, price: Money) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;
        state
            .products
            .retain(|p| !(p.name == name && p.price == Some(price)));
        Ok(())
    }

    async fn submit_order(&self, order: &Order) -> Result<Order, TransportError> {
        let delay = self.state.lock().await.submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        state.submit_attempts.push(order.id.clone());
        state.ensure_online()?;
        if state.rejected_orders.contains(&order.id) {
            return Err(TransportError::Status {
                status: 500,
                endpoint: "/orders".into(),
            });
        }

        let mut stored = order.clone();
        stored.server_id = Some(state.allocate_server_id());
        stored.version = Some(0);
        state.orders.push(stored.clone());
        Ok(stored)
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>, TransportError> {
        let state = self.state.lock().await;
        state.ensure_online()?;
        if state.fail_order_fetches {
            return Err(TransportError::Status {
                status: 502,
                endpoint: "/orders".into(),
            });
        }
        Ok(state.orders.clone())
    }

    async fn remove_order(&self, id: &OrderId) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;
        let before = state.orders.len();
        state.orders.retain(|o| &o.id != id);
        if state.orders.len() == before {
            return Err(TransportError::Status {
                status: 404,
                endpoint: format!("/orders/{id}"),
            });
        }
        Ok(())
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, TransportError> {
        let state = self.state.lock().await;
        state.ensure_online()?;
        Ok(state.categories.clone())
    }

    async fn add_category(&self, name: &str) -> Result<Category, TransportError> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;
        let category = Category {
            server_id: Some(state.allocate_server_id()),
            name: name.to_string(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn fetch_customer_data(&self) -> Result<Vec<CustomerProfile>, TransportError> {
        let state = self.state.lock().await;
        state.ensure_online()?;
        Ok(state.customers.clone())
    }

    async fn save_customer_data(&self, profile: &CustomerProfile) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;
        let mut stored = profile.clone();
        stored.server_id = Some(state.allocate_server_id());
        state.customers.push(stored);
        Ok(())
    }
}
