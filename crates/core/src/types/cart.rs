//! Cart lines and their composite identity.

use serde::{Deserialize, Serialize};

use super::{Money, Product, ProductId, Variety};

/// Composite identity of a cart line: `(name, price, size)`.
///
/// Two lines with equal keys are the same line. Equality on `price` is
/// numeric, so `250` and `250.00` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub name: String,
    pub price: Money,
    pub size: Option<String>,
}

impl LineKey {
    /// Create a key.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Money, size: Option<String>) -> Self {
        Self {
            name: name.into(),
            price,
            size,
        }
    }

    /// Whether this key has the given name and price, ignoring size.
    #[must_use]
    pub fn matches(&self, name: &str, price: Money) -> bool {
        self.name == name && self.price == price
    }
}

/// One line of the in-progress order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub name: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl CartLine {
    /// A quantity-1 line for a plain product, or `None` if it has no price.
    #[must_use]
    pub fn for_product(product: &Product) -> Option<Self> {
        product.price.map(|price| Self {
            name: product.name.clone(),
            price,
            size: None,
            quantity: 1,
            product_id: Some(product.id),
            category: product.category.clone(),
        })
    }

    /// A line for one variety of a product; the variety's size and price win.
    #[must_use]
    pub fn for_variety(product: &Product, variety: &Variety, quantity: u32) -> Self {
        Self {
            name: product.name.clone(),
            price: variety.price,
            size: Some(variety.size.clone()),
            quantity,
            product_id: Some(product.id),
            category: product.category.clone(),
        }
    }

    /// The line's composite identity.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.name.clone(), self.price, self.size.clone())
    }

    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}
