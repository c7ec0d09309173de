//! Read-through catalog cache.
//!
//! Products and categories are fetched from the remote service and mirrored
//! into the `products` and `categories` collections. When the service cannot
//! be reached the mirrored copy is served instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use till_core::{Category, Money, Product};
use tracing::{info, instrument, warn};

use crate::error::{Result, TillError};
use crate::remote::{RemoteService, Source};
use crate::store::{self, Collection, LocalStore, StoredRecord};

/// Category used for products without one.
pub const UNCATEGORIZED: &str = "Others";

/// Products as served, and where they came from.
#[derive(Debug, Clone)]
pub struct CatalogView {
    pub products: Vec<Product>,
    pub source: Source,
}

/// Catalog products and categories.
pub struct Catalog {
    remote: Arc<dyn RemoteService>,
    store: Arc<dyn LocalStore>,
}

impl Catalog {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteService>, store: Arc<dyn LocalStore>) -> Self {
        Self { remote, store }
    }

    /// Fetch the catalog, falling back to the cached copy.
    #[instrument(skip(self))]
    pub async fn load(&self) -> CatalogView {
        match self.remote.fetch_products().await {
            Ok(products) => {
                if let Err(e) = store::save_all(
                    self.store.as_ref(),
                    Collection::Products,
                    &products,
                    |_, p| p.id.to_string(),
                )
                .await
                {
                    warn!(error = %e, "Failed to cache catalog");
                }
                CatalogView {
                    products,
                    source: Source::Remote,
                }
            }
            Err(e) => {
                warn!(error = %e, "Catalog unavailable, using cached copy");
                CatalogView {
                    products: store::load_or_empty(self.store.as_ref(), Collection::Products)
                        .await,
                    source: Source::Cache,
                }
            }
        }
    }

    /// Add a product remotely, then mirror it locally.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` for a product with neither a price
    /// nor varieties, `TillError::Transport` if the service rejects it, or
    /// `TillError::Storage` if the mirror cannot be written.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add_product(&self, product: &Product) -> Result<()> {
        if product.name.trim().is_empty() {
            return Err(TillError::Validation("Product name is required".to_string()));
        }
        if product.price.is_none() && !product.has_varieties() {
            return Err(TillError::Validation(format!(
                "{} needs a price or at least one size",
                product.name
            )));
        }

        self.remote.add_product(product).await?;
        let record = StoredRecord::encode(product.id.to_string(), product)?;
        self.store.put_items(Collection::Products, vec![record]).await?;
        info!("Product added");
        Ok(())
    }

    /// Remove every product with this name and price, remotely and locally.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Transport` if the service rejects the removal, or
    /// `TillError::Storage` if the mirror cannot be updated.
    #[instrument(skip(self))]
    pub async fn remove_product(&self, name: &str, price: Money) -> Result<()> {
        self.remote.remove_product(name, price).await?;

        let cached: Vec<Product> = store::load(self.store.as_ref(), Collection::Products).await?;
        let kept: Vec<Product> = cached
            .into_iter()
            .filter(|p| !(p.name == name && p.price == Some(price)))
            .collect();
        store::save_all(
            self.store.as_ref(),
            Collection::Products,
            &kept,
            |_, p| p.id.to_string(),
        )
        .await?;
        info!("Product removed");
        Ok(())
    }

    /// Fetch categories, falling back to the cached copy.
    pub async fn categories(&self) -> (Vec<Category>, Source) {
        match self.remote.fetch_categories().await {
            Ok(categories) => {
                if let Err(e) = store::save_all(
                    self.store.as_ref(),
                    Collection::Categories,
                    &categories,
                    |_, c| c.name.clone(),
                )
                .await
                {
                    warn!(error = %e, "Failed to cache categories");
                }
                (categories, Source::Remote)
            }
            Err(e) => {
                warn!(error = %e, "Categories unavailable, using cached copy");
                (
                    store::load_or_empty(self.store.as_ref(), Collection::Categories).await,
                    Source::Cache,
                )
            }
        }
    }

    /// Create a category remotely, then mirror it locally.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` for a blank name, `TillError::Transport`
    /// if the service rejects it, or `TillError::Storage` if the mirror cannot
    /// be written.
    pub async fn add_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TillError::Validation("Category name is required".to_string()));
        }

        let category = self.remote.add_category(name).await?;
        let record = StoredRecord::encode(category.name.clone(), &category)?;
        self.store
            .put_items(Collection::Categories, vec![record])
            .await?;
        Ok(category)
    }
}

/// Group products by category for display.
///
/// Products whose name contains `search` (case-insensitive) are kept. Groups
/// named in `priority` come first in that order; the rest follow
/// alphabetically. Products without a category go to [`UNCATEGORIZED`].
#[must_use]
pub fn group_by_category(
    products: &[Product],
    search: &str,
    priority: &[&str],
) -> Vec<(String, Vec<Product>)> {
    let needle = search.to_lowercase();
    let mut groups: BTreeMap<String, Vec<Product>> = BTreeMap::new();
    for product in products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
    {
        let category = product
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNCATEGORIZED);
        groups
            .entry(category.to_string())
            .or_default()
            .push(product.clone());
    }

    let mut ordered = Vec::with_capacity(groups.len());
    for name in priority {
        if let Some(group) = groups.remove(*name) {
            ordered.push(((*name).to_string(), group));
        }
    }
    ordered.extend(groups);
    ordered
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use till_core::{ProductId, Variety};

    use super::*;
    use crate::remote::FakeRemote;
    use crate::store::MemoryStore;

    fn menu() -> Vec<Product> {
        vec![
            Product::plain(ProductId::new(1), "Margherita", Money::from_major(250))
                .in_category("Pizza"),
            Product::plain(ProductId::new(2), "Coke", Money::from_major(60)).in_category("Drinks"),
            Product::plain(ProductId::new(3), "Garlic Bread", Money::from_major(120))
                .in_category("Bread"),
            Product::with_varieties(
                ProductId::new(7),
                "Farmhouse",
                vec![Variety::new("M", Money::from_major(300))],
            )
            .in_category("Family pizza"),
            Product::plain(ProductId::new(9), "Dip", Money::from_major(30)),
        ]
    }

    #[test]
    fn test_group_by_category_priority_then_alphabetical() {
        let groups = group_by_category(&menu(), "", &["Pizza", "Family pizza", "Extra"]);
        let names: Vec<&str> = groups.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Pizza", "Family pizza", "Bread", "Drinks", "Others"]);
    }

    #[test]
    fn test_group_by_category_search() {
        let groups = group_by_category(&menu(), "BREAD", &["Pizza"]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.first().unwrap().0, "Bread");
    }

    #[tokio::test]
    async fn test_load_caches_and_falls_back() {
        let remote = Arc::new(FakeRemote::new().with_products(menu()));
        let catalog = Catalog::new(remote.clone(), Arc::new(MemoryStore::new()));

        let fresh = catalog.load().await;
        assert_eq!(fresh.source, Source::Remote);

        remote.set_online(false).await;
        let cached = catalog.load().await;
        assert_eq!(cached.source, Source::Cache);
        assert_eq!(cached.products, fresh.products);
    }

    #[tokio::test]
    async fn test_remove_product_updates_cache() {
        let remote = Arc::new(FakeRemote::new().with_products(menu()));
        let catalog = Catalog::new(remote.clone(), Arc::new(MemoryStore::new()));
        catalog.load().await;

        catalog
            .remove_product("Coke", Money::from_major(60))
            .await
            .unwrap();
        assert_eq!(remote.products().await.len(), 4);

        remote.set_online(false).await;
        let cached = catalog.load().await;
        assert!(cached.products.iter().all(|p| p.name != "Coke"));
    }

    #[tokio::test]
    async fn test_add_product_validation_and_mirror() {
        let remote = Arc::new(FakeRemote::new());
        let catalog = Catalog::new(remote.clone(), Arc::new(MemoryStore::new()));

        let unpriced = Product::with_varieties(ProductId::new(5), "Mystery", vec![]);
        assert!(matches!(
            catalog.add_product(&unpriced).await,
            Err(TillError::Validation(_))
        ));

        let calzone = Product::plain(ProductId::new(5), "Calzone", Money::from_major(220));
        catalog.add_product(&calzone).await.unwrap();
        remote.set_online(false).await;
        assert_eq!(catalog.load().await.products, vec![calzone]);
    }

    #[tokio::test]
    async fn test_categories_round_trip_through_cache() {
        let remote = Arc::new(FakeRemote::new());
        let catalog = Catalog::new(remote.clone(), Arc::new(MemoryStore::new()));
        assert!(matches!(
            catalog.add_category("  ").await,
            Err(TillError::Validation(_))
        ));
        catalog.add_category("Pizza").await.unwrap();

        remote.set_online(false).await;
        let (categories, source) = catalog.categories().await;
        assert_eq!(source, Source::Cache);
        assert_eq!(categories.first().unwrap().name, "Pizza");
    }
}
