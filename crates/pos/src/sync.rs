//! Replays the offline queue against the remote service.
//!
//! A reconciliation pass walks the queue oldest first. Each entry is sent
//! with its server-assigned fields stripped. On acknowledgment the entry is
//! deleted and the history cache refreshed; on the first failure the pass
//! stops and every later entry stays queued, untouched, for the next pass.
//! Only one pass runs at a time.

use std::sync::Arc;

use till_core::{LocalId, OrderId, QueueState};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::error::{Result, TillError};
use crate::history::OrderHistoryAggregator;
use crate::queue::OfflineOrderQueue;
use crate::remote::RemoteService;

/// How a reconciliation pass ended.
#[derive(Debug)]
pub enum PassOutcome {
    /// Every entry present at the start of the pass was acknowledged.
    Drained,
    /// The pass stopped at this order; it and everything after it remain
    /// queued.
    Stopped { order_id: OrderId, error: TillError },
    /// Another pass was already running; nothing was attempted.
    AlreadyRunning,
}

/// Result of one reconciliation pass.
#[derive(Debug)]
pub struct SyncReport {
    /// Orders acknowledged in this pass, in replay order.
    pub acked: Vec<OrderId>,
    /// Entries still queued when the pass ended.
    pub remaining: usize,
    pub outcome: PassOutcome,
    /// Whether the history cache reflects the last acknowledgment.
    pub history_refreshed: bool,
}

impl SyncReport {
    const fn already_running() -> Self {
        Self {
            acked: Vec::new(),
            remaining: 0,
            outcome: PassOutcome::AlreadyRunning,
            history_refreshed: false,
        }
    }

    /// Whether the queue was fully drained.
    #[must_use]
    pub const fn is_drained(&self) -> bool {
        matches!(self.outcome, PassOutcome::Drained)
    }
}

/// Drains the offline queue.
pub struct SyncReconciler {
    remote: Arc<dyn RemoteService>,
    queue: Arc<OfflineOrderQueue>,
    history: Arc<OrderHistoryAggregator>,
    pass: Mutex<()>,
}

impl SyncReconciler {
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteService>,
        queue: Arc<OfflineOrderQueue>,
        history: Arc<OrderHistoryAggregator>,
    ) -> Self {
        Self {
            remote,
            queue,
            history,
            pass: Mutex::new(()),
        }
    }

    /// Run one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Storage` only if the queue cannot be read at the
    /// start of the pass. Failures during the pass end it and are reported
    /// in [`SyncReport::outcome`].
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<SyncReport> {
        let Ok(_pass) = self.pass.try_lock() else {
            info!("Reconciliation already running");
            return Ok(SyncReport::already_running());
        };

        let entries = self.queue.entries().await?;
        let queued = entries.len();
        info!(queued, "Reconciliation pass started");

        let mut acked = Vec::new();
        let mut outcome = PassOutcome::Drained;
        let mut history_refreshed = false;
        let mut refresh_owed = false;

        for entry in entries {
            let order_id = entry.order.id.clone();
            transition(&order_id, &entry.local_id, QueueState::Queued, QueueState::Syncing);

            if let Err(e) = self.remote.submit_order(&entry.order.replay_payload()).await {
                transition(&order_id, &entry.local_id, QueueState::Syncing, QueueState::Failed);
                warn!(%order_id, error = %e, "Replay failed, stopping pass");
                transition(&order_id, &entry.local_id, QueueState::Failed, QueueState::Queued);
                outcome = PassOutcome::Stopped {
                    order_id,
                    error: e.into(),
                };
                break;
            }

            transition(&order_id, &entry.local_id, QueueState::Syncing, QueueState::Acked);
            if let Err(e) = self.queue.remove(entry.local_id).await {
                // The order is acknowledged but still queued; the next pass
                // will send it again.
                warn!(%order_id, error = %e, "Could not dequeue acknowledged order");
                acked.push(order_id.clone());
                outcome = PassOutcome::Stopped { order_id, error: e };
                break;
            }
            acked.push(order_id);

            match self.history.refresh().await {
                Ok(_) => {
                    history_refreshed = true;
                    refresh_owed = false;
                }
                Err(e) => {
                    warn!(error = %e, "History refresh failed, retrying at end of pass");
                    history_refreshed = false;
                    refresh_owed = true;
                }
            }
        }

        if refresh_owed {
            match self.history.refresh().await {
                Ok(_) => history_refreshed = true,
                Err(e) => warn!(error = %e, "History refresh failed"),
            }
        }

        let remaining = self.queue.len().await.unwrap_or(queued - acked.len());
        info!(acked = acked.len(), remaining, "Reconciliation pass finished");

        Ok(SyncReport {
            acked,
            remaining,
            outcome,
            history_refreshed,
        })
    }
}

fn transition(order_id: &OrderId, local_id: &LocalId, from: QueueState, to: QueueState) {
    debug_assert!(from.can_transition_to(to));
    info!(%order_id, %local_id, %from, %to, "Queue transition");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use till_core::{Customer, Money, Order, OrderType};

    use super::*;
    use crate::config::FeatureGrant;
    use crate::remote::FakeRemote;
    use crate::store::{LocalStore, MemoryStore};

    struct Fixture {
        remote: Arc<FakeRemote>,
        queue: Arc<OfflineOrderQueue>,
        history: Arc<OrderHistoryAggregator>,
        reconciler: Arc<SyncReconciler>,
    }

    fn fixture() -> Fixture {
        let remote = Arc::new(FakeRemote::new());
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let queue = Arc::new(OfflineOrderQueue::new(store.clone()));
        let history = Arc::new(OrderHistoryAggregator::new(
            remote.clone(),
            store,
            queue.clone(),
            FeatureGrant::basic(),
        ));
        let reconciler = Arc::new(SyncReconciler::new(
            remote.clone(),
            queue.clone(),
            history.clone(),
        ));
        Fixture {
            remote,
            queue,
            history,
            reconciler,
        }
    }

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
    async fn test_empty_queue_drains() {
        let f = fixture();
        let report = f.reconciler.reconcile().await.unwrap();
        assert!(report.is_drained());
        assert!(report.acked.is_empty());
        assert!(!report.history_refreshed);
    }

    #[tokio::test]
    async fn test_pass_replays_in_fifo_order() {
        let f = fixture();
        let orders: Vec<Order> = (1..=3).map(|n| order(n * 100)).collect();
        for o in &orders {
            f.queue.enqueue(o).await.unwrap();
        }

        let report = f.reconciler.reconcile().await.unwrap();
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id.clone()).collect();
        assert!(report.is_drained());
        assert_eq!(report.acked, ids);
        assert_eq!(report.remaining, 0);
        assert!(report.history_refreshed);
        assert_eq!(f.remote.submit_attempts().await, ids);
    }

    #[tokio::test]
    async fn test_failure_stops_pass_without_skipping() {
        let f = fixture();
        let orders: Vec<Order> = (1..=4).map(|n| order(n * 100)).collect();
        for o in &orders {
            f.queue.enqueue(o).await.unwrap();
        }
        let second = orders.get(1).unwrap();
        f.remote.reject_order(&second.id).await;

        let report = f.reconciler.reconcile().await.unwrap();
        assert_eq!(report.acked, vec![orders.first().unwrap().id.clone()]);
        assert_eq!(report.remaining, 3);
        assert!(matches!(
            &report.outcome,
            PassOutcome::Stopped { order_id, error: TillError::Transport(_) } if order_id == &second.id
        ));
        // Entries after the failing one were never attempted.
        assert_eq!(f.remote.submit_attempts().await.len(), 2);

        let queued: Vec<OrderId> = f
            .queue
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.order.id)
            .collect();
        let expected: Vec<OrderId> = orders.iter().skip(1).map(|o| o.id.clone()).collect();
        assert_eq!(queued, expected);

        f.remote.accept_order(&second.id).await;
        let report = f.reconciler.reconcile().await.unwrap();
        assert!(report.is_drained());
        assert_eq!(report.acked, expected);
    }

    #[tokio::test]
    async fn test_replay_strips_server_fields() {
        let f = fixture();
        let mut o = order(100);
        o.server_id = Some("stale".into());
        o.version = Some(3);
        f.queue.enqueue(&o).await.unwrap();

        f.reconciler.reconcile().await.unwrap();
        let stored = f.remote.orders().await;
        assert_eq!(stored.len(), 1);
        assert_ne!(stored.first().unwrap().server_id.as_deref(), Some("stale"));
        assert_eq!(stored.first().unwrap().version, Some(0));
    }

    #[tokio::test]
    async fn test_history_refresh_failure_does_not_stop_pass() {
        let f = fixture();
        f.queue.enqueue(&order(100)).await.unwrap();
        f.queue.enqueue(&order(200)).await.unwrap();
        f.remote.fail_order_fetches(true).await;

        let report = f.reconciler.reconcile().await.unwrap();
        assert!(report.is_drained());
        assert_eq!(report.acked.len(), 2);
        assert!(!report.history_refreshed);
        assert!(f.queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_pass_keeps_everything() {
        let f = fixture();
        f.queue.enqueue(&order(100)).await.unwrap();
        f.remote.set_online(false).await;

        let report = f.reconciler.reconcile().await.unwrap();
        assert!(report.acked.is_empty());
        assert_eq!(report.remaining, 1);
        assert!(matches!(report.outcome, PassOutcome::Stopped { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_pass_is_refused() {
        let f = fixture();
        f.queue.enqueue(&order(100)).await.unwrap();

        let guard = f.reconciler.pass.lock().await;
        let report = f.reconciler.reconcile().await.unwrap();
        assert!(matches!(report.outcome, PassOutcome::AlreadyRunning));
        drop(guard);

        assert_eq!(f.queue.len().await.unwrap(), 1);
        let report = f.reconciler.reconcile().await.unwrap();
        assert!(report.is_drained());
        assert_eq!(f.history.load().await.orders.len(), 1);
    }
}
