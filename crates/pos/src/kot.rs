//! Kitchen order tickets.
//!
//! A KOT is a frozen copy of the cart sent to the kitchen. Tickets are kept
//! per order type until cleared; printing them is someone else's job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use till_core::{CartLine, LocalId, OrderType};
use tracing::info;

use crate::error::Result;
use crate::store::{self, Collection, LocalStore, StoredRecord};

/// One kitchen order ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KotTicket {
    pub id: LocalId,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<CartLine>,
    pub order_type: OrderType,
}

impl KotTicket {
    #[must_use]
    pub fn new(items: Vec<CartLine>, order_type: OrderType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: LocalId::generate(),
            timestamp,
            items,
            order_type,
        }
    }
}

/// Ticket log in the `kot` collection.
pub struct KotLedger {
    store: Arc<dyn LocalStore>,
}

impl KotLedger {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Append a ticket.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the ticket cannot be written.
    pub async fn record(&self, ticket: &KotTicket) -> Result<()> {
        let record = StoredRecord::encode(ticket.id.to_string(), ticket)?;
        self.store.put_items(Collection::Kot, vec![record]).await?;
        info!(
            ticket = %ticket.id,
            order_type = %ticket.order_type,
            items = ticket.items.len(),
            "KOT recorded"
        );
        Ok(())
    }

    /// Tickets of one order type, oldest first.
    pub async fn tickets(&self, order_type: OrderType) -> Vec<KotTicket> {
        store::load_or_empty::<KotTicket>(self.store.as_ref(), Collection::Kot)
            .await
            .into_iter()
            .filter(|t| t.order_type == order_type)
            .collect()
    }

    /// Discard the tickets of one order type. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the ledger cannot be read or written.
    pub async fn clear(&self, order_type: OrderType) -> Result<usize> {
        let tickets: Vec<KotTicket> = store::load(self.store.as_ref(), Collection::Kot).await?;
        let mut removed = 0;
        for ticket in tickets.iter().filter(|t| t.order_type == order_type) {
            self.store
                .delete_item(Collection::Kot, &ticket.id.to_string())
                .await?;
            removed += 1;
        }
        Ok(removed)
    }
}
