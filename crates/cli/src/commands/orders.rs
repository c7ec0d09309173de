//! KOT, checkout and offline queue commands.

use rust_decimal::Decimal;
use till_core::{Customer, Money, OrderType, Phone};
use till_pos::Register;
use till_pos::checkout::Submission;
use till_pos::sync::PassOutcome;

use super::CommandError;

/// Customer and bill details for a checkout.
pub struct CheckoutDetails {
    pub order_type: OrderType,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub include_gst: bool,
    pub charge: Decimal,
    pub discount: Decimal,
}

/// Send the cart to the kitchen.
///
/// # Errors
///
/// Returns the till error for an empty cart or an unwritable ledger.
#[allow(clippy::print_stdout)]
pub async fn kot(till: &Register, order_type: OrderType) -> Result<(), CommandError> {
    let ticket = till.kot(order_type).await?;
    println!("KOT {} ({order_type})", ticket.timestamp.format("%d/%m/%Y %H:%M"));
    for line in &ticket.items {
        let size = line.size.as_deref().unwrap_or("");
        println!("  {} x {} {size}", line.quantity, line.name);
    }
    Ok(())
}

/// Check out the cart.
///
/// # Errors
///
/// Returns the till error for an invalid phone number, an empty cart, or an
/// order that could be neither submitted nor queued.
#[allow(clippy::print_stdout)]
pub async fn checkout(till: &Register, details: CheckoutDetails) -> Result<(), CommandError> {
    let phone = details
        .phone
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(Phone::parse)
        .transpose()
        .map_err(till_pos::TillError::from)?;
    let customer = Customer {
        name: details.name,
        phone,
        address: details.address,
    };

    let mut options = till.bill_options(details.include_gst);
    options.service_charge = Money::new(details.charge);
    options.discount = Money::new(details.discount);

    let checkout = till.checkout(details.order_type, customer, &options).await?;
    let bill = checkout.bill;
    println!("Items:    {}", bill.item_total.display());
    if !bill.gst.is_zero() {
        println!("GST:      {}", bill.gst.display());
    }
    if !bill.service_charge.is_zero() {
        println!("Charge:   {}", bill.service_charge.display());
    }
    if !bill.discount.is_zero() {
        println!("Discount: {}", bill.discount.display());
    }
    println!("Total:    {}", bill.grand_total.display());

    match checkout.submission {
        Submission::Acked(order) => println!("Order {} placed", order.id),
        Submission::Queued(entry) => println!(
            "Server unreachable. Order {} saved offline and will be synced later.",
            entry.order.id
        ),
    }
    Ok(())
}

/// List queued orders.
///
/// # Errors
///
/// Returns the till error if the queue cannot be read.
#[allow(clippy::print_stdout)]
pub async fn queue(till: &Register) -> Result<(), CommandError> {
    let entries = till.queue().entries().await?;
    if entries.is_empty() {
        println!("No orders waiting to sync");
    }
    for entry in &entries {
        println!(
            "{} {} {} {}",
            entry.queued_at.format("%d/%m/%Y %H:%M"),
            entry.order.id,
            entry.order.order_type,
            entry.order.total_amount.display()
        );
    }
    Ok(())
}

/// Replay queued orders.
///
/// # Errors
///
/// Returns the till error if the queue cannot be read.
#[allow(clippy::print_stdout)]
pub async fn sync(till: &Register) -> Result<(), CommandError> {
    let report = till.sync().await?;
    match &report.outcome {
        PassOutcome::Drained => println!("Synced {} order(s)", report.acked.len()),
        PassOutcome::Stopped { order_id, error } => println!(
            "Synced {} order(s); stopped at {order_id}: {}. {} still queued.",
            report.acked.len(),
            error.user_message(),
            report.remaining
        ),
        PassOutcome::AlreadyRunning => println!("A sync is already running"),
    }
    Ok(())
}
