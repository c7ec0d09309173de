//! Catalog listing.

use till_core::Product;
use till_pos::Register;
use till_pos::catalog::group_by_category;
use till_pos::remote::Source;

/// Categories shown first, in this order.
const PRIORITY: &[&str] = &[
    "Pizza",
    "Family pizza",
    "Indian twist pizza",
    "Mini pizza",
    "World wide pizza",
    "Combo pizza",
    "Extra",
];

/// Print the catalog grouped by category.
#[allow(clippy::print_stdout)]
pub async fn list(till: &Register, search: &str) {
    let view = till.catalog().load().await;
    if view.source == Source::Cache {
        println!("(offline: showing saved catalog)");
    }

    for (category, products) in group_by_category(&view.products, search, PRIORITY) {
        println!("{category}");
        for product in &products {
            println!("  {}", describe(product));
        }
    }
}

fn describe(product: &Product) -> String {
    if product.has_varieties() {
        let sizes: Vec<String> = product
            .varieties
            .iter()
            .map(|v| format!("{} {}", v.size, v.price.display()))
            .collect();
        format!("#{} {} [{}]", product.id, product.name, sizes.join(", "))
    } else {
        let price = product
            .price
            .map_or_else(|| "-".to_string(), |p| p.display());
        format!("#{} {} {price}", product.id, product.name)
    }
}
