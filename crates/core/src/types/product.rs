//! Catalog products and their size variants.

use serde::{Deserialize, Serialize};

use super::{Money, ProductId};

/// One size/price option of a multi-size product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variety {
    /// Size label (e.g. "M", "Family").
    pub size: String,
    /// Price of this size.
    pub price: Money,
}

impl Variety {
    /// Create a new variety.
    #[must_use]
    pub fn new(size: impl Into<String>, price: Money) -> Self {
        Self {
            size: size.into(),
            price,
        }
    }
}

/// A catalog product.
///
/// Either `price` is set (a plain product) or `varieties` is non-empty (a
/// multi-size product whose price comes from the chosen variety).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(default)]
    pub varieties: Vec<Variety>,
}

impl Product {
    /// A plain, single-price product.
    #[must_use]
    pub fn plain(id: ProductId, name: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            category: None,
            price: Some(price),
            varieties: Vec::new(),
        }
    }

    /// A multi-size product.
    #[must_use]
    pub fn with_varieties(id: ProductId, name: impl Into<String>, varieties: Vec<Variety>) -> Self {
        Self {
            id,
            name: name.into(),
            category: None,
            price: None,
            varieties,
        }
    }

    /// Set the category.
    #[must_use]
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Whether selecting this product needs a variety choice first.
    #[must_use]
    pub fn has_varieties(&self) -> bool {
        !self.varieties.is_empty()
    }

    /// Look up a variety by size and price.
    #[must_use]
    pub fn variety(&self, size: &str, price: Money) -> Option<&Variety> {
        self.varieties
            .iter()
            .find(|v| v.size == size && v.price == price)
    }
}

/// A catalog category.
///
/// The remote service assigns `_id`; locally created categories have none
/// until the next refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    pub name: String,
}

impl Category {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            server_id: None,
            name: name.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_plain_product() {
        let json = r#"{"id": 1, "name": "Margherita", "category": "Pizza", "price": 250}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Some(Money::from_major(250)));
        assert!(!product.has_varieties());
    }

    #[test]
    fn test_deserialize_variety_product() {
        let json = r#"{
            "id": 7,
            "name": "Farmhouse",
            "varieties": [{"size": "M", "price": 300}, {"size": "L", "price": 450}]
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.has_varieties());
        assert_eq!(product.price, None);
        assert!(product.variety("M", Money::from_major(300)).is_some());
        assert!(product.variety("M", Money::from_major(450)).is_none());
    }

    #[test]
    fn test_category_wire_shape() {
        let category: Category = serde_json::from_str(r#"{"_id": "c1", "name": "Pizza"}"#).unwrap();
        assert_eq!(category.server_id.as_deref(), Some("c1"));
        let value = serde_json::to_value(Category::named("Extra")).unwrap();
        assert_eq!(value, serde_json::json!({"name": "Extra"}));
    }
}
