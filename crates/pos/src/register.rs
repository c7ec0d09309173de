//! The till: every component wired over one store and one remote.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use till_core::{
    CartLine, Customer, CustomerProfile, Money, Order, OrderType, Product, ProductId, Variety,
};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::billing::{Bill, BillOptions};
use crate::cart::CartConsolidator;
use crate::catalog::Catalog;
use crate::checkout::{OrderSubmitter, Submission};
use crate::config::{FeatureGrant, TillConfig};
use crate::customers::CustomerBook;
use crate::error::Result;
use crate::history::OrderHistoryAggregator;
use crate::kot::{KotLedger, KotTicket};
use crate::queue::OfflineOrderQueue;
use crate::remote::{HttpRemote, RemoteService};
use crate::store::{self, LocalStore};
use crate::sync::{SyncReconciler, SyncReport};
use crate::variant::VariantSelector;

/// Outcome of a checkout.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub bill: Bill,
    pub submission: Submission,
}

/// One till session.
pub struct Register {
    selector: Mutex<VariantSelector>,
    cart: CartConsolidator,
    catalog: Catalog,
    customers: CustomerBook,
    kot: KotLedger,
    queue: Arc<OfflineOrderQueue>,
    submitter: OrderSubmitter,
    history: Arc<OrderHistoryAggregator>,
    reconciler: SyncReconciler,
    gst_percent: Decimal,
}

impl Register {
    /// Open the configured store and remote service.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the store cannot be opened, or
    /// `TillError::Transport` if the HTTP client cannot be built.
    pub async fn open(config: &TillConfig) -> Result<Self> {
        let store = store::open(&config.database_url).await?;
        let remote = HttpRemote::new(config.api_base_url.clone(), config.http_timeout)?;
        info!(
            database = %config.database_url,
            remote = %config.api_base_url,
            "Register opened"
        );
        Ok(Self::with_parts(store, Arc::new(remote), config.features, config.gst_percent).await)
    }

    /// Wire a register over an existing store and remote.
    pub async fn with_parts(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteService>,
        grant: FeatureGrant,
        gst_percent: Decimal,
    ) -> Self {
        let queue = Arc::new(OfflineOrderQueue::new(store.clone()));
        let history = Arc::new(OrderHistoryAggregator::new(
            remote.clone(),
            store.clone(),
            queue.clone(),
            grant,
        ));
        Self {
            selector: Mutex::new(VariantSelector::new()),
            cart: CartConsolidator::open(store.clone()).await,
            catalog: Catalog::new(remote.clone(), store.clone()),
            customers: CustomerBook::new(remote.clone(), store.clone()),
            kot: KotLedger::new(store),
            submitter: OrderSubmitter::new(remote.clone(), queue.clone()),
            reconciler: SyncReconciler::new(remote, queue.clone(), history.clone()),
            queue,
            history,
            gst_percent,
        }
    }

    #[must_use]
    pub const fn cart(&self) -> &CartConsolidator {
        &self.cart
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn customers(&self) -> &CustomerBook {
        &self.customers
    }

    #[must_use]
    pub const fn kot_ledger(&self) -> &KotLedger {
        &self.kot
    }

    #[must_use]
    pub const fn queue(&self) -> &Arc<OfflineOrderQueue> {
        &self.queue
    }

    #[must_use]
    pub const fn history(&self) -> &Arc<OrderHistoryAggregator> {
        &self.history
    }

    /// Bill options with the configured GST rate.
    #[must_use]
    pub const fn bill_options(&self, include_gst: bool) -> BillOptions {
        BillOptions {
            gst_percent: self.gst_percent,
            include_gst,
            service_charge: Money::ZERO,
            discount: Money::ZERO,
        }
    }

    /// Tick or untick a size of a product.
    pub async fn stage(&self, product_id: ProductId, variety: &Variety, checked: bool) {
        self.selector.lock().await.stage(product_id, variety, checked);
    }

    /// Change the staged quantity of a size.
    pub async fn change_staged_quantity(&self, product_id: ProductId, variety: &Variety, delta: i32) {
        self.selector
            .lock()
            .await
            .change_quantity(variety, delta, product_id);
    }

    /// Add a product to the cart.
    ///
    /// A multi-size product commits its staged sizes, which are then
    /// discarded. A plain product adds one unit.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` if a multi-size product has nothing
    /// staged, or `TillError::Storage` if the cart cannot be saved. Staged
    /// sizes survive a failed commit.
    #[instrument(skip(self, product), fields(product = %product.name))]
    pub async fn add_to_cart(&self, product: &Product) -> Result<()> {
        if !product.has_varieties() {
            return self.cart.commit(product, &[]).await;
        }

        let mut selector = self.selector.lock().await;
        let staged = selector.committable(product.id)?;
        self.cart.commit(product, &staged).await?;
        selector.discard(product.id);
        Ok(())
    }

    /// Remove a product from the catalog and every cart line for it.
    ///
    /// # Errors
    ///
    /// Returns the catalog error if the product cannot be removed remotely,
    /// in which case the cart is left alone.
    pub async fn remove_product(&self, name: &str, price: Money) -> Result<()> {
        self.catalog.remove_product(name, price).await?;
        self.cart.remove_line(name, price).await?;
        Ok(())
    }

    /// Send the cart to the kitchen and clear it.
    ///
    /// The cart is frozen before the ticket is written, so lines added
    /// meanwhile stay in the cart for the next ticket.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` for an empty cart, or
    /// `TillError::Storage` if the ticket cannot be recorded. The frozen
    /// lines are put back in the cart on error.
    #[instrument(skip(self))]
    pub async fn kot(&self, order_type: OrderType) -> Result<KotTicket> {
        let lines = self.cart.freeze().await?;
        let ticket = KotTicket::new(lines, order_type, Utc::now());
        if let Err(e) = self.kot.record(&ticket).await {
            self.put_back(ticket.items).await;
            return Err(e);
        }
        Ok(ticket)
    }

    /// Freeze the cart into an order and submit it.
    ///
    /// The cart is emptied and persisted before anything is sent; the order
    /// then owns the lines. Two checkouts never share a line, and lines added
    /// while a submission is in flight stay in the cart. The order total is
    /// the bill's grand total. Customer details, when given, are also saved
    /// to the address book on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` for an empty cart, or
    /// `TillError::Storage` if the cart cannot be frozen or the order could
    /// neither be submitted nor queued. In the latter case the frozen lines
    /// are put back in the cart.
    #[instrument(skip(self, customer, options))]
    pub async fn checkout(
        &self,
        order_type: OrderType,
        customer: Customer,
        options: &BillOptions,
    ) -> Result<Checkout> {
        let lines = self.cart.freeze().await?;
        let bill = Bill::compute(&lines, options);
        let profile = (!customer.is_empty()).then(|| CustomerProfile::from(&customer));
        let order = Order::capture(lines, bill.grand_total, order_type, customer, Utc::now());

        let submission = match self.submitter.submit(&order).await {
            Ok(submission) => submission,
            Err(e) => {
                self.put_back(order.products).await;
                return Err(e);
            }
        };

        if let Some(profile) = profile
            && let Err(e) = self.customers.save(&profile).await
        {
            warn!(error = %e, "Customer details not saved");
        }

        Ok(Checkout { bill, submission })
    }

    /// Run a reconciliation pass over the offline queue.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the queue cannot be read.
    pub async fn sync(&self) -> Result<SyncReport> {
        self.reconciler.reconcile().await
    }

    async fn put_back(&self, lines: Vec<CartLine>) {
        let count = lines.len();
        if let Err(e) = self.cart.restore(lines).await {
            warn!(lines = count, error = %e, "Frozen lines could not be put back in the cart");
        }
    }
}
