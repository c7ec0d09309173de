//! Staging of size/price variant choices before they reach the cart.
//!
//! Staged selections live for the session only. They survive the variant
//! picker being closed and reopened, but not a restart.

use till_core::{ProductId, Variety};
use tracing::debug;

use crate::error::{Result, TillError};

/// A variant choice awaiting commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedVariant {
    pub product_id: ProductId,
    pub variety: Variety,
    pub quantity: u32,
}

/// Staged variant selections, across products.
///
/// Entries are identified by `(product_id, size, price)`; staging the same
/// variant twice keeps a single entry.
#[derive(Debug, Default)]
pub struct VariantSelector {
    staged: Vec<StagedVariant>,
}

impl VariantSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check or uncheck a variant.
    ///
    /// Checking adds it with quantity 1 unless already staged; unchecking
    /// removes it.
    pub fn stage(&mut self, product_id: ProductId, variety: &Variety, checked: bool) {
        let position = self.position(product_id, variety);
        match (checked, position) {
            (true, None) => {
                debug!(%product_id, size = %variety.size, "Variant staged");
                self.staged.push(StagedVariant {
                    product_id,
                    variety: variety.clone(),
                    quantity: 1,
                });
            }
            (false, Some(index)) => {
                self.staged.remove(index);
            }
            _ => {}
        }
    }

    /// Adjust a staged variant's quantity.
    ///
    /// A result below 1 unstages the variant. Unstaged variants are ignored.
    pub fn change_quantity(&mut self, variety: &Variety, delta: i32, product_id: ProductId) {
        let Some(index) = self.position(product_id, variety) else {
            return;
        };
        let Some(entry) = self.staged.get_mut(index) else {
            return;
        };

        match entry.quantity.checked_add_signed(delta) {
            Some(quantity) if quantity >= 1 => entry.quantity = quantity,
            _ => {
                self.staged.remove(index);
            }
        }
    }

    /// Selections staged for one product, in staging order.
    pub fn staged_for(&self, product_id: ProductId) -> impl Iterator<Item = &StagedVariant> {
        self.staged
            .iter()
            .filter(move |s| s.product_id == product_id)
    }

    /// Whether anything is staged for the product.
    #[must_use]
    pub fn has_staged(&self, product_id: ProductId) -> bool {
        self.staged_for(product_id).next().is_some()
    }

    /// The product's staged selections, ready to commit.
    ///
    /// The staged set is left as is; call [`discard`](Self::discard) once the
    /// commit has gone through.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Validation` if nothing is staged for the product.
    pub fn committable(&self, product_id: ProductId) -> Result<Vec<StagedVariant>> {
        let staged: Vec<StagedVariant> = self.staged_for(product_id).cloned().collect();
        if staged.is_empty() {
            return Err(TillError::Validation(
                "Select at least one size before adding to the order".to_string(),
            ));
        }
        Ok(staged)
    }

    /// Drop the product's staged selections.
    pub fn discard(&mut self, product_id: ProductId) {
        self.staged.retain(|s| s.product_id != product_id);
    }

    /// Drop every staged selection.
    pub fn clear(&mut self) {
        self.staged.clear();
    }

    /// Total staged entries across products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    fn position(&self, product_id: ProductId, variety: &Variety) -> Option<usize> {
        self.staged
            .iter()
            .position(|s| s.product_id == product_id && s.variety == *variety)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use till_core::Money;

    use super::*;

    fn medium() -> Variety {
        Variety::new("M", Money::from_major(300))
    }

    fn large() -> Variety {
        Variety::new("L", Money::from_major(450))
    }

    const FARMHOUSE: ProductId = ProductId::new(7);

    #[test]
    fn test_stage_is_keyed_by_product_size_and_price() {
        let mut selector = VariantSelector::new();
        selector.stage(FARMHOUSE, &medium(), true);
        selector.stage(FARMHOUSE, &medium(), true);
        selector.stage(ProductId::new(8), &medium(), true);
        selector.stage(FARMHOUSE, &Variety::new("M", Money::from_major(320)), true);

        assert_eq!(selector.len(), 3);
        assert_eq!(selector.staged_for(FARMHOUSE).count(), 2);
    }

    #[test]
    fn test_uncheck_removes() {
        let mut selector = VariantSelector::new();
        selector.stage(FARMHOUSE, &medium(), true);
        selector.stage(FARMHOUSE, &large(), true);
        selector.stage(FARMHOUSE, &medium(), false);

        let staged: Vec<_> = selector.staged_for(FARMHOUSE).collect();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged.first().unwrap().variety, large());
    }

    #[test]
    fn test_change_quantity_floor_removes() {
        let mut selector = VariantSelector::new();
        selector.stage(FARMHOUSE, &medium(), true);
        selector.change_quantity(&medium(), 2, FARMHOUSE);
        assert_eq!(selector.staged_for(FARMHOUSE).next().unwrap().quantity, 3);

        selector.change_quantity(&medium(), -2, FARMHOUSE);
        assert_eq!(selector.staged_for(FARMHOUSE).next().unwrap().quantity, 1);

        selector.change_quantity(&medium(), -1, FARMHOUSE);
        assert!(!selector.has_staged(FARMHOUSE));
    }

    #[test]
    fn test_change_quantity_of_unstaged_is_ignored() {
        let mut selector = VariantSelector::new();
        selector.change_quantity(&medium(), 1, FARMHOUSE);
        assert!(selector.is_empty());
    }

    #[test]
    fn test_committable_then_discard_only_touches_that_product() {
        let mut selector = VariantSelector::new();
        selector.stage(FARMHOUSE, &medium(), true);
        selector.stage(ProductId::new(8), &large(), true);

        let staged = selector.committable(FARMHOUSE).unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(selector.len(), 2);

        selector.discard(FARMHOUSE);
        assert_eq!(selector.len(), 1);
        assert!(selector.has_staged(ProductId::new(8)));
    }

    #[test]
    fn test_committable_empty_is_rejected() {
        let mut selector = VariantSelector::new();
        selector.stage(ProductId::new(8), &large(), true);

        let result = selector.committable(FARMHOUSE);
        assert!(matches!(result, Err(TillError::Validation(_))));
        assert_eq!(selector.len(), 1);
    }
}
