//! Order history report.

use till_core::OrderId;
use till_pos::Register;
use till_pos::history::DaySelector;
use till_pos::remote::Source;

use super::CommandError;

/// Print one day's orders and total, optionally with recent daily totals.
#[allow(clippy::print_stdout)]
pub async fn show(till: &Register, day: DaySelector, recent: Option<u32>) {
    let summary = till.history().day_summary(day).await;
    if summary.source == Source::Cache {
        println!("(offline: showing saved history and queued orders)");
    }

    println!("{}", summary.day);
    for order in &summary.orders {
        println!(
            "  {} {} {} {}",
            order.timestamp.format("%H:%M"),
            order.id,
            order.order_type,
            order.total_amount.display()
        );
    }
    println!("Grand total: {}", summary.grand_total.display());

    if let Some(days) = recent {
        println!();
        for (day, total) in till.history().recent_totals(days).await {
            println!("{day}: {}", total.display());
        }
    }
}

/// Delete an order from the order log.
///
/// # Errors
///
/// Returns the till error when the advanced feature is not granted or the
/// order service refuses.
pub async fn remove(till: &Register, id: &str) -> Result<(), CommandError> {
    till.history().remove_order(&OrderId::new(id)).await?;
    tracing::info!(order_id = %id, "Order removed");
    Ok(())
}
