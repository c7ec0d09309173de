//! The in-progress order.
//!
//! [`CartConsolidator`] owns the live cart until checkout or a KOT freezes
//! it. Lines are identified by their [`LineKey`] (`name`, `price`, `size`);
//! no two lines ever share a key and no line is ever held at quantity 0.
//!
//! Every mutation is applied to a copy, persisted as a full snapshot to the
//! `cart` collection, and only then made visible. A failed write leaves the
//! cart exactly as it was and surfaces the error.

use std::collections::HashMap;
use std::sync::Arc;

use till_core::{CartLine, LineKey, Money, Product};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::{Result, TillError};
use crate::store::{self, Collection, LocalStore};
use crate::variant::StagedVariant;

/// Lines in insertion order with a key index.
#[derive(Debug, Clone, Default)]
struct LineBook {
    lines: Vec<CartLine>,
    index: HashMap<LineKey, usize>,
}

impl LineBook {
    /// Build from stored lines, merging any repeated keys and dropping
    /// zero-quantity lines.
    fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut book = Self::default();
        for line in lines.into_iter().filter(|l| l.quantity > 0) {
            let key = line.key();
            if let Some(existing) = book.get_mut(&key) {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            } else {
                book.insert(key, line);
            }
        }
        book
    }

    fn get_mut(&mut self, key: &LineKey) -> Option<&mut CartLine> {
        let position = *self.index.get(key)?;
        self.lines.get_mut(position)
    }

    fn insert(&mut self, key: LineKey, line: CartLine) {
        self.index.insert(key, self.lines.len());
        self.lines.push(line);
    }

    /// Keep only lines matching `keep`; returns how many were dropped.
    fn retain(&mut self, keep: impl Fn(&CartLine) -> bool) -> usize {
        let before = self.lines.len();
        self.lines.retain(keep);
        self.reindex();
        before - self.lines.len()
    }

    fn reindex(&mut self) {
        self.index = self
            .lines
            .iter()
            .enumerate()
            .map(|(position, line)| (line.key(), position))
            .collect();
    }

    /// Apply `delta` to one line, removing it if the result is below 1.
    fn apply_delta(&mut self, key: &LineKey, delta: i32) -> bool {
        let Some(line) = self.get_mut(key) else {
            return false;
        };
        match line.quantity.checked_add_signed(delta) {
            Some(quantity) if quantity >= 1 => line.quantity = quantity,
            _ => {
                let key = key.clone();
                self.retain(|l| l.key() != key);
            }
        }
        true
    }

    fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

/// Owner of the in-progress cart.
pub struct CartConsolidator {
    store: Arc<dyn LocalStore>,
    book: Mutex<LineBook>,
}

impl CartConsolidator {
    /// Open the cart, restoring any lines persisted before a restart.
    ///
    /// An unreadable store restores an empty cart.
    pub async fn open(store: Arc<dyn LocalStore>) -> Self {
        let lines: Vec<CartLine> = store::load_or_empty(store.as_ref(), Collection::Cart).await;
        if !lines.is_empty() {
            debug!(lines = lines.len(), "Restored cart");
        }
        Self {
            store,
            book: Mutex::new(LineBook::from_lines(lines)),
        }
    }

    /// Merge a product selection into the cart.
    ///
    /// With no staged variants the product itself is the line: an existing
    /// line is incremented by one, otherwise a quantity-1 line is added.
    /// With staged variants each one becomes a line whose quantity is the
    /// staged quantity, replacing the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` if the product has no price and no
    /// variants are staged, or `TillError::Storage` if the cart cannot be
    /// persisted. The cart is unchanged on error.
    #[instrument(skip(self, product, staged), fields(product = %product.name, staged = staged.len()))]
    pub async fn commit(&self, product: &Product, staged: &[StagedVariant]) -> Result<()> {
        let mut book = self.book.lock().await;
        let mut next = book.clone();

        if staged.is_empty() {
            let line = CartLine::for_product(product).ok_or_else(|| {
                TillError::Validation(format!("{} needs a size to be chosen", product.name))
            })?;
            let key = line.key();
            if let Some(existing) = next.get_mut(&key) {
                existing.quantity = existing.quantity.saturating_add(1);
            } else {
                next.insert(key, line);
            }
        } else {
            for selection in staged {
                let line = CartLine::for_variety(product, &selection.variety, selection.quantity);
                let key = line.key();
                if let Some(existing) = next.get_mut(&key) {
                    existing.quantity = selection.quantity;
                } else {
                    next.insert(key, line);
                }
            }
        }

        self.persist(&next).await?;
        *book = next;
        Ok(())
    }

    /// Apply `delta` to every line with this name and price.
    ///
    /// Lines whose quantity drops below 1 are removed. Returns whether any
    /// line matched.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the cart cannot be persisted.
    pub async fn change_quantity(&self, name: &str, price: Money, delta: i32) -> Result<bool> {
        self.mutate(|book| {
            let keys: Vec<LineKey> = book
                .lines
                .iter()
                .map(CartLine::key)
                .filter(|k| k.matches(name, price))
                .collect();
            for key in &keys {
                book.apply_delta(key, delta);
            }
            !keys.is_empty()
        })
        .await
    }

    /// Apply `delta` to exactly one line.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the cart cannot be persisted.
    pub async fn adjust(&self, key: &LineKey, delta: i32) -> Result<bool> {
        self.mutate(|book| book.apply_delta(key, delta)).await
    }

    /// Remove every line with this name and price.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the cart cannot be persisted.
    pub async fn remove_line(&self, name: &str, price: Money) -> Result<bool> {
        self.mutate(|book| book.retain(|l| !l.key().matches(name, price)) > 0)
            .await
    }

    /// Empty the cart and hand back its lines.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` if the cart is empty, or
    /// `TillError::Storage` if the empty cart cannot be persisted (the cart
    /// keeps its lines in that case).
    pub async fn freeze(&self) -> Result<Vec<CartLine>> {
        let mut book = self.book.lock().await;
        if book.lines.is_empty() {
            return Err(TillError::Validation("The order is empty".to_string()));
        }
        let empty = LineBook::default();
        self.persist(&empty).await?;
        Ok(std::mem::replace(&mut *book, empty).lines)
    }

    /// Put frozen lines back after a checkout that could not complete.
    ///
    /// The frozen lines go first; lines added since the freeze follow, with
    /// a shared key merging into one line.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the cart cannot be persisted.
    pub async fn restore(&self, frozen: Vec<CartLine>) -> Result<()> {
        let mut book = self.book.lock().await;
        let lines = frozen.into_iter().chain(book.lines.iter().cloned()).collect();
        let next = LineBook::from_lines(lines);
        self.persist(&next).await?;
        *book = next;
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the empty cart cannot be persisted.
    pub async fn clear(&self) -> Result<()> {
        let mut book = self.book.lock().await;
        let empty = LineBook::default();
        self.persist(&empty).await?;
        *book = empty;
        Ok(())
    }

    /// Current lines in insertion order.
    pub async fn lines(&self) -> Vec<CartLine> {
        self.book.lock().await.lines.clone()
    }

    /// `Σ price × quantity`, without tax or charges.
    pub async fn total(&self) -> Money {
        self.book.lock().await.total()
    }

    pub async fn is_empty(&self) -> bool {
        self.book.lock().await.lines.is_empty()
    }

    async fn mutate<F>(&self, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut LineBook) -> bool + Send,
    {
        let mut book = self.book.lock().await;
        let mut next = book.clone();
        if !apply(&mut next) {
            return Ok(false);
        }
        self.persist(&next).await?;
        *book = next;
        Ok(true)
    }

    async fn persist(&self, book: &LineBook) -> Result<()> {
        store::save_all(
            self.store.as_ref(),
            Collection::Cart,
            &book.lines,
            |position, _| position.to_string(),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to persist cart");
            TillError::from(e)
        })
    }
}
