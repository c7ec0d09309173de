//! Checkout figures: item total, GST, service charge and discount.

use rust_decimal::Decimal;
use till_core::{CartLine, Money};

/// Charges applied on top of the item total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillOptions {
    /// GST percentage, applied when `include_gst` is set.
    pub gst_percent: Decimal,
    pub include_gst: bool,
    /// Delivery or service charge.
    pub service_charge: Money,
    pub discount: Money,
}

impl BillOptions {
    /// GST included at `gst_percent`, no charges or discount.
    #[must_use]
    pub const fn with_gst(gst_percent: Decimal) -> Self {
        Self {
            gst_percent,
            include_gst: true,
            service_charge: Money::ZERO,
            discount: Money::ZERO,
        }
    }

    /// No GST, charges or discount.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            gst_percent: Decimal::ZERO,
            include_gst: false,
            service_charge: Money::ZERO,
            discount: Money::ZERO,
        }
    }
}

/// Computed bill for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bill {
    pub item_total: Money,
    pub gst: Money,
    pub service_charge: Money,
    pub discount: Money,
    /// `item_total + gst + service_charge - discount`, never below zero.
    pub grand_total: Money,
}

impl Bill {
    #[must_use]
    pub fn compute(lines: &[CartLine], options: &BillOptions) -> Self {
        let item_total: Money = lines.iter().map(CartLine::line_total).sum();
        let gst = if options.include_gst {
            item_total.percent(options.gst_percent)
        } else {
            Money::ZERO
        };
        let grand_total =
            (item_total + gst + options.service_charge).saturating_sub(options.discount);

        Self {
            item_total,
            gst,
            service_charge: options.service_charge,
            discount: options.discount,
            grand_total,
        }
    }
}
