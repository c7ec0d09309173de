//! Direct order submission with offline fallback.

use std::sync::Arc;

use till_core::{Order, QueueEntry, QueueState};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::queue::OfflineOrderQueue;
use crate::remote::RemoteService;

/// Where a submitted order ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The remote service stored the order. Carries the stored copy.
    Acked(Order),
    /// The remote service could not take it; the order is in the offline
    /// queue.
    Queued(QueueEntry),
}

impl Submission {
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }

    /// The order as captured (or as stored remotely when acked).
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Acked(order) => order,
            Self::Queued(entry) => &entry.order,
        }
    }
}

/// Sends captured orders, queueing those the remote service cannot take.
pub struct OrderSubmitter {
    remote: Arc<dyn RemoteService>,
    queue: Arc<OfflineOrderQueue>,
}

impl OrderSubmitter {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteService>, queue: Arc<OfflineOrderQueue>) -> Self {
        Self { remote, queue }
    }

    /// Submit an order.
    ///
    /// Any transport failure sends the order to the offline queue; the call
    /// then still succeeds with [`Submission::Queued`].
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` only when the remote write failed and the
    /// order could not be queued either. The order is then in neither place
    /// and the caller still owns it.
    #[instrument(skip(self, order), fields(order_id = %order.id, total = %order.total_amount))]
    pub async fn submit(&self, order: &Order) -> Result<Submission> {
        match self.remote.submit_order(order).await {
            Ok(stored) => {
                info!(from = %QueueState::Captured, to = %QueueState::Acked, "Order submitted");
                Ok(Submission::Acked(stored))
            }
            Err(e) => {
                warn!(error = %e, "Order submission failed, queueing for sync");
                let entry = self.queue.enqueue(order).await?;
                Ok(Submission::Queued(entry))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use till_core::{Customer, Money, OrderType};

    use super::*;
    use crate::error::TillError;
    use crate::remote::FakeRemote;
    use crate::store::{LocalStore, MemoryStore};

    fn order() -> Order {
        Order::capture(
            vec![],
            Money::from_major(250),
            OrderType::DineIn,
            Customer::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_online_submission_skips_queue() {
        let remote = Arc::new(FakeRemote::new());
        let queue = Arc::new(OfflineOrderQueue::new(Arc::new(MemoryStore::new())));
        let submitter = OrderSubmitter::new(remote.clone(), queue.clone());

        let submission = submitter.submit(&order()).await.unwrap();
        assert!(matches!(&submission, Submission::Acked(o) if o.server_id.is_some()));
        assert!(queue.is_empty().await.unwrap());
        assert_eq!(remote.orders().await.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_submission_is_queued() {
        let remote = Arc::new(FakeRemote::new());
        remote.set_online(false).await;
        let queue = Arc::new(OfflineOrderQueue::new(Arc::new(MemoryStore::new())));
        let submitter = OrderSubmitter::new(remote.clone(), queue.clone());

        let o = order();
        let submission = submitter.submit(&o).await.unwrap();
        assert!(submission.is_queued());
        assert_eq!(submission.order().id, o.id);
        assert_eq!(queue.len().await.unwrap(), 1);
        assert!(remote.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_unqueueable_order_is_an_error() {
        let remote = Arc::new(FakeRemote::new());
        remote.set_online(false).await;
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true).await;
        let shared: Arc<dyn LocalStore> = store;
        let submitter = OrderSubmitter::new(remote, Arc::new(OfflineOrderQueue::new(shared)));

        assert!(matches!(
            submitter.submit(&order()).await,
            Err(TillError::Storage(_))
        ));
    }
}
