//! Durable FIFO of orders the remote service has not acknowledged.
//!
//! Entries live in the `orders` collection keyed by their [`LocalId`], in
//! insertion order. An entry leaves the queue only after the remote service
//! has acknowledged that order.

use std::sync::Arc;

use chrono::Utc;
use till_core::{LocalId, Order, OrderId, QueueEntry, QueueState};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::error::Result;
use crate::store::{self, Collection, LocalStore, StoredRecord};

/// The offline order queue.
pub struct OfflineOrderQueue {
    store: Arc<dyn LocalStore>,
    /// Serializes writers so the duplicate check and the append are atomic.
    writer: Mutex<()>,
}

impl OfflineOrderQueue {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// Append an order to the queue.
    ///
    /// An order already queued is not queued again; its existing entry is
    /// returned instead.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the queue cannot be read or written.
    /// The order is then not durable and the caller must keep it.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn enqueue(&self, order: &Order) -> Result<QueueEntry> {
        let _writer = self.writer.lock().await;

        if let Some(existing) = self
            .entries()
            .await?
            .into_iter()
            .find(|e| e.order.id == order.id)
        {
            info!(local_id = %existing.local_id, "Order already queued");
            return Ok(existing);
        }

        let entry = QueueEntry::new(order.clone(), Utc::now());
        let record = StoredRecord::encode(entry.local_id.to_string(), &entry)?;
        self.store.put_items(Collection::Orders, vec![record]).await?;

        info!(
            local_id = %entry.local_id,
            from = %QueueState::Captured,
            to = %QueueState::Queued,
            total = %entry.order.total_amount,
            "Order queued for sync"
        );
        Ok(entry)
    }

    /// All entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the queue cannot be read.
    pub async fn entries(&self) -> Result<Vec<QueueEntry>> {
        Ok(store::load(self.store.as_ref(), Collection::Orders).await?)
    }

    /// Queued orders for display; an unreadable queue reads as empty.
    pub async fn pending_orders(&self) -> Vec<Order> {
        store::load_or_empty::<QueueEntry>(self.store.as_ref(), Collection::Orders)
            .await
            .into_iter()
            .map(|e| e.order)
            .collect()
    }

    /// Remove one entry. Only called once its order has been acknowledged.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the entry cannot be deleted.
    pub async fn remove(&self, local_id: LocalId) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.store
            .delete_item(Collection::Orders, &local_id.to_string())
            .await?;
        Ok(())
    }

    /// Whether an order with this id is queued.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the queue cannot be read.
    pub async fn contains(&self, order_id: &OrderId) -> Result<bool> {
        Ok(self.entries().await?.iter().any(|e| &e.order.id == order_id))
    }

    /// Number of queued entries, counting only those [`entries`](Self::entries)
    /// can decode.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the queue cannot be read.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.entries().await?.len())
    }

    /// Whether the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` if the queue cannot be read.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use till_core::{Customer, Money, OrderType};

    use super::*;
    use crate::error::TillError;
    use crate::store::MemoryStore;

    fn order(total: i64) -> Order {
        Order::capture(
            vec![],
            Money::from_major(total),
            OrderType::Delivery,
            Customer::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_enqueue_preserves_fifo_order() {
        let queue = OfflineOrderQueue::new(Arc::new(MemoryStore::new()));
        let first = order(100);
        let second = order(200);
        queue.enqueue(&first).await.unwrap();
        queue.enqueue(&second).await.unwrap();

        let ids: Vec<OrderId> = queue
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.order.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_enqueue_is_idempotent_on_order_id() {
        let queue = OfflineOrderQueue::new(Arc::new(MemoryStore::new()));
        let order = order(100);
        let a = queue.enqueue(&order).await.unwrap();
        let b = queue.enqueue(&order).await.unwrap();

        assert_eq!(a.local_id, b.local_id);
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_exact() {
        let queue = OfflineOrderQueue::new(Arc::new(MemoryStore::new()));
        let a = queue.enqueue(&order(100)).await.unwrap();
        let b = queue.enqueue(&order(200)).await.unwrap();

        queue.remove(a.local_id).await.unwrap();
        let remaining = queue.entries().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.first().unwrap().local_id, b.local_id);
        assert!(!queue.contains(&a.order.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_queue_survives_reopen() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let entry = OfflineOrderQueue::new(store.clone())
            .enqueue(&order(150))
            .await
            .unwrap();

        let reopened = OfflineOrderQueue::new(store);
        let entries = reopened.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        let restored = entries.first().unwrap();
        assert_eq!(restored.local_id, entry.local_id);
        assert_eq!(restored.order.id, entry.order.id);
        assert_eq!(restored.order.total_amount, Money::from_major(150));
    }

    #[tokio::test]
    async fn test_enqueue_surfaces_storage_failure() {
        let store = Arc::new(MemoryStore::new());
        let queue = OfflineOrderQueue::new(store.clone());
        store.set_unavailable(true).await;

        let result = queue.enqueue(&order(100)).await;
        assert!(matches!(result, Err(TillError::Storage(_))));
        assert!(queue.pending_orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_len_agrees_with_entries_over_malformed_records() {
        let store = Arc::new(MemoryStore::new());
        let queue = OfflineOrderQueue::new(store.clone());
        queue.enqueue(&order(100)).await.unwrap();
        store
            .put_items(
                Collection::Orders,
                vec![StoredRecord {
                    id: "garbage".to_string(),
                    body: serde_json::json!({ "not": "an entry" }),
                }],
            )
            .await
            .unwrap();

        assert_eq!(store.get_all(Collection::Orders).await.unwrap().len(), 2);
        assert_eq!(queue.entries().await.unwrap().len(), 1);
        assert_eq!(queue.len().await.unwrap(), 1);
    }
}
