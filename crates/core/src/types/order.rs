//! Orders and offline queue entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartLine, LocalId, Money, OrderId, OrderType, Phone};

/// Optional customer details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customer {
    pub name: Option<String>,
    pub phone: Option<Phone>,
    pub address: Option<String>,
}

impl Customer {
    /// Whether no detail was given.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none()
    }
}

/// A customer record as exchanged with `/customerdata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_address: Option<String>,
}

impl From<&Customer> for CustomerProfile {
    fn from(customer: &Customer) -> Self {
        Self {
            server_id: None,
            customer_name: non_blank(customer.name.clone()),
            customer_phone: customer.phone.as_ref().map(|p| p.as_str().to_string()),
            customer_address: non_blank(customer.address.clone()),
        }
    }
}

/// A submitted order: a frozen snapshot of the cart.
///
/// Immutable once created. `server_id` and `version` are assigned by the
/// remote service and are never sent back to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub products: Vec<CartLine>,
    pub total_amount: Money,
    #[serde(default)]
    pub order_type: OrderType,
    /// Always present on the wire; `null` when unknown.
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_address: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl Order {
    /// Freeze cart lines into a new order with a fresh client id.
    #[must_use]
    pub fn capture(
        products: Vec<CartLine>,
        total_amount: Money,
        order_type: OrderType,
        customer: Customer,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            timestamp,
            products,
            total_amount,
            order_type,
            phone: customer.phone.map(Phone::into_inner),
            customer_name: non_blank(customer.name),
            customer_address: non_blank(customer.address),
            server_id: None,
            version: None,
        }
    }

    /// The body to POST when replaying this order.
    ///
    /// Strips the server-assigned `_id`/`__v` and normalizes a blank phone to
    /// `null`.
    #[must_use]
    pub fn replay_payload(&self) -> Self {
        Self {
            server_id: None,
            version: None,
            phone: non_blank(self.phone.clone()),
            ..self.clone()
        }
    }

    /// Sum of `price × quantity` over the order's lines (no tax or charges).
    #[must_use]
    pub fn item_total(&self) -> Money {
        self.products.iter().map(CartLine::line_total).sum()
    }
}

/// An order held in the offline queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub local_id: LocalId,
    #[serde(with = "timestamp")]
    pub queued_at: DateTime<Utc>,
    #[serde(flatten)]
    pub order: Order,
}

impl QueueEntry {
    /// Wrap an order with a fresh local id.
    #[must_use]
    pub fn new(order: Order, queued_at: DateTime<Utc>) -> Self {
        Self {
            local_id: LocalId::generate(),
            queued_at,
            order,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Timestamps are written as RFC 3339 and read from RFC 3339 or epoch millis.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {ms}"))),
            Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(D::Error::custom),
        }
    }
}
