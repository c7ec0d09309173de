//! Cart commands.

use rust_decimal::Decimal;
use till_core::{Money, ProductId};
use till_pos::Register;

use super::CommandError;

/// Print the cart lines and total.
#[allow(clippy::print_stdout)]
pub async fn show(till: &Register) {
    let lines = till.cart().lines().await;
    if lines.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in &lines {
        let size = line.size.as_deref().map_or(String::new(), |s| format!(" ({s})"));
        println!(
            "{} x {}{size} @ {} = {}",
            line.quantity,
            line.name,
            line.price.display(),
            line.line_total().display()
        );
    }
    println!("Total: {}", till.cart().total().await.display());
}

/// Add a catalog product, or `qty` of one of its sizes.
///
/// # Errors
///
/// Returns `CommandError::NotFound` for an unknown product or size, or the
/// till error if the cart cannot be updated.
pub async fn add(
    till: &Register,
    product_id: i64,
    size: Option<&str>,
    qty: u32,
) -> Result<(), CommandError> {
    let id = ProductId::new(product_id);
    let view = till.catalog().load().await;
    let product = view
        .products
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| CommandError::NotFound(format!("No product #{product_id}")))?;

    if let Some(size) = size {
        let variety = product
            .varieties
            .iter()
            .find(|v| v.size.eq_ignore_ascii_case(size))
            .cloned()
            .ok_or_else(|| {
                CommandError::NotFound(format!("{} has no size {size}", product.name))
            })?;
        till.stage(id, &variety, true).await;
        let extra = i32::try_from(qty.saturating_sub(1)).unwrap_or(i32::MAX);
        if extra > 0 {
            till.change_staged_quantity(id, &variety, extra).await;
        }
    }

    till.add_to_cart(&product).await?;
    tracing::info!(product = %product.name, "Added to cart");
    Ok(())
}

/// Change the quantity of every line with this name and price.
///
/// # Errors
///
/// Returns `CommandError::NotFound` if no line matches.
pub async fn change(
    till: &Register,
    name: &str,
    price: Decimal,
    delta: i32,
) -> Result<(), CommandError> {
    if till.cart().change_quantity(name, Money::new(price), delta).await? {
        Ok(())
    } else {
        Err(CommandError::NotFound(format!("{name} is not in the cart")))
    }
}

/// Remove every line with this name and price.
///
/// # Errors
///
/// Returns `CommandError::NotFound` if no line matches.
pub async fn remove(till: &Register, name: &str, price: Decimal) -> Result<(), CommandError> {
    if till.cart().remove_line(name, Money::new(price)).await? {
        Ok(())
    } else {
        Err(CommandError::NotFound(format!("{name} is not in the cart")))
    }
}
