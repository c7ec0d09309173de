//! Order history reporting.
//!
//! Orders are bucketed into local calendar days. A day window runs from
//! 00:00:00.000 to 23:59:59.999 local time inclusive.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Days, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use till_core::{Money, Order, OrderId};
use tracing::{info, instrument, warn};

use crate::config::FeatureGrant;
use crate::error::{Result, TillError};
use crate::queue::OfflineOrderQueue;
use crate::remote::{RemoteService, Source};
use crate::store::{self, Collection, LocalStore};

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// A relative calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaySelector {
    Today,
    Yesterday,
    /// `n` days back, `n >= 2`.
    DaysAgo(u32),
}

impl DaySelector {
    /// Selector for `days` days back.
    #[must_use]
    pub const fn days_back(days: u32) -> Self {
        match days {
            0 => Self::Today,
            1 => Self::Yesterday,
            n => Self::DaysAgo(n),
        }
    }

    /// How many days back this selector points.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::Today => 0,
            Self::Yesterday => 1,
            Self::DaysAgo(n) => n,
        }
    }

    /// The inclusive window covered by this day, relative to `now`.
    #[must_use]
    pub fn window<Tz: TimeZone>(self, now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
        let tz = now.timezone();
        let day = now
            .date_naive()
            .checked_sub_days(Days::new(u64::from(self.offset())))
            .unwrap_or(NaiveDate::MIN);

        let start = day.and_time(NaiveTime::MIN);
        let end = start
            .checked_add_signed(Duration::milliseconds(DAY_MILLIS - 1))
            .unwrap_or(start);
        (
            resolve_local(&tz, &start, true),
            resolve_local(&tz, &end, false),
        )
    }
}

/// Map a local wall-clock time to UTC, taking the earliest (or latest)
/// instant when the time is ambiguous and treating nonexistent times as UTC.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    let mapped = tz.from_local_datetime(naive);
    let resolved = if earliest {
        mapped.earliest()
    } else {
        mapped.latest()
    };
    resolved.map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
}

impl fmt::Display for DaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => write!(f, "Today"),
            Self::Yesterday => write!(f, "Yesterday"),
            Self::DaysAgo(n) => write!(f, "{n} days ago"),
        }
    }
}

impl FromStr for DaySelector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("today") {
            return Ok(Self::Today);
        }
        if s.eq_ignore_ascii_case("yesterday") {
            return Ok(Self::Yesterday);
        }

        let invalid =
            || format!("invalid day: {s} (expected Today, Yesterday or \"<n> days ago\")");
        let digits = s
            .strip_suffix("days ago")
            .or_else(|| s.strip_suffix("day ago"))
            .ok_or_else(invalid)?
            .trim();
        digits
            .parse::<u32>()
            .map(Self::days_back)
            .map_err(|_| invalid())
    }
}

/// Orders whose timestamp falls inside the selected day, relative to `now`.
#[must_use]
pub fn filter_by_day_at<Tz: TimeZone>(
    orders: &[Order],
    selector: DaySelector,
    now: &DateTime<Tz>,
) -> Vec<Order> {
    let (start, end) = selector.window(now);
    orders
        .iter()
        .filter(|o| o.timestamp >= start && o.timestamp <= end)
        .cloned()
        .collect()
}

/// [`filter_by_day_at`] against the local clock.
#[must_use]
pub fn filter_by_day(orders: &[Order], selector: DaySelector) -> Vec<Order> {
    filter_by_day_at(orders, selector, &Local::now())
}

/// `Σ totalAmount`.
#[must_use]
pub fn grand_total(orders: &[Order]) -> Money {
    orders.iter().map(|o| o.total_amount).sum()
}

/// Orders available for reporting, and where they came from.
#[derive(Debug, Clone)]
pub struct HistoryView {
    pub orders: Vec<Order>,
    pub source: Source,
}

/// One day's orders and their total.
#[derive(Debug, Clone)]
pub struct DaySummary {
    pub day: DaySelector,
    pub orders: Vec<Order>,
    pub grand_total: Money,
    pub source: Source,
}

/// Read side of the order log.
pub struct OrderHistoryAggregator {
    remote: Arc<dyn RemoteService>,
    store: Arc<dyn LocalStore>,
    queue: Arc<OfflineOrderQueue>,
    grant: FeatureGrant,
}

impl OrderHistoryAggregator {
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteService>,
        store: Arc<dyn LocalStore>,
        queue: Arc<OfflineOrderQueue>,
        grant: FeatureGrant,
    ) -> Self {
        Self {
            remote,
            store,
            queue,
            grant,
        }
    }

    /// Fetch the order log and overwrite the local history cache with it.
    ///
    /// # Errors
    ///
    /// Returns `TillError::Transport` if the log cannot be fetched. A failed
    /// cache write is logged, not returned.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<Order>> {
        let orders = self.remote.fetch_orders().await?;
        if let Err(e) = store::save_all(
            self.store.as_ref(),
            Collection::OrderHistory,
            &orders,
            |_, order| order.id.to_string(),
        )
        .await
        {
            warn!(error = %e, "Failed to cache order history");
        }
        Ok(orders)
    }

    /// Orders for reporting.
    ///
    /// Falls back to the cached history plus still-queued orders when the
    /// remote service cannot be reached.
    pub async fn load(&self) -> HistoryView {
        match self.refresh().await {
            Ok(orders) => HistoryView {
                orders,
                source: Source::Remote,
            },
            Err(e) => {
                warn!(error = %e, "Order history unavailable, using local copy");
                let mut orders: Vec<Order> =
                    store::load_or_empty(self.store.as_ref(), Collection::OrderHistory).await;
                for pending in self.queue.pending_orders().await {
                    if !orders.iter().any(|o| o.id == pending.id) {
                        orders.push(pending);
                    }
                }
                HistoryView {
                    orders,
                    source: Source::Cache,
                }
            }
        }
    }

    /// Orders and total for one day, relative to `now`.
    pub async fn day_summary_at<Tz: TimeZone>(
        &self,
        day: DaySelector,
        now: &DateTime<Tz>,
    ) -> DaySummary {
        let view = self.load().await;
        let orders = filter_by_day_at(&view.orders, day, now);
        DaySummary {
            day,
            grand_total: grand_total(&orders),
            orders,
            source: view.source,
        }
    }

    /// Orders and total for one day.
    pub async fn day_summary(&self, day: DaySelector) -> DaySummary {
        self.day_summary_at(day, &Local::now()).await
    }

    /// Totals for today and each of the previous `days - 1` days.
    pub async fn recent_totals_at<Tz: TimeZone>(
        &self,
        days: u32,
        now: &DateTime<Tz>,
    ) -> Vec<(DaySelector, Money)> {
        let view = self.load().await;
        (0..days)
            .map(DaySelector::days_back)
            .map(|day| (day, grand_total(&filter_by_day_at(&view.orders, day, now))))
            .collect()
    }

    /// Totals for today and each of the previous `days - 1` days.
    pub async fn recent_totals(&self, days: u32) -> Vec<(DaySelector, Money)> {
        self.recent_totals_at(days, &Local::now()).await
    }

    /// Delete an order from the remote log and the local history cache.
    ///
    /// # Errors
    ///
    /// Returns `TillError::PermissionDenied` without the advanced feature
    /// grant (nothing is changed), or `TillError::Transport` if the remote
    /// deletion fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn remove_order(&self, id: &OrderId) -> Result<()> {
        if !self.grant.allows_order_removal() {
            return Err(TillError::PermissionDenied(
                "Advance feature not granted".to_string(),
            ));
        }

        self.remote.remove_order(id).await?;
        self.store
            .delete_item(Collection::OrderHistory, id.as_str())
            .await?;
        info!("Order removed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::FixedOffset;
    use till_core::{Customer, OrderType};

    use super::*;
    use crate::remote::FakeRemote;
    use crate::store::MemoryStore;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 1800).unwrap()
    }

    fn order_at(ts: DateTime<Utc>, total: i64) -> Order {
        Order::capture(
            vec![],
            Money::from_major(total),
            OrderType::Delivery,
            Customer::default(),
            ts,
        )
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, ms: u32) -> DateTime<Utc> {
        ist()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .checked_add_signed(Duration::milliseconds(i64::from(ms)))
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_selector_parse_and_display() {
        assert_eq!("Today".parse::<DaySelector>().unwrap(), DaySelector::Today);
        assert_eq!("yesterday".parse::<DaySelector>().unwrap(), DaySelector::Yesterday);
        assert_eq!("3 days ago".parse::<DaySelector>().unwrap(), DaySelector::DaysAgo(3));
        assert_eq!("1 days ago".parse::<DaySelector>().unwrap(), DaySelector::Yesterday);
        assert!("last week".parse::<DaySelector>().is_err());
        assert!("5".parse::<DaySelector>().is_err());
        assert!("days ago".parse::<DaySelector>().is_err());
        assert_eq!(DaySelector::DaysAgo(4).to_string(), "4 days ago");
    }

    #[test]
    fn test_today_window_is_inclusive_to_the_millisecond() {
        let now = ist().with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
        let orders = vec![
            order_at(local(2026, 10, 16, 0, 0, 0, 0), 100),
            order_at(local(2026, 10, 16, 23, 59, 59, 999), 200),
            order_at(local(2026, 10, 15, 23, 59, 59, 999), 400),
            order_at(local(2026, 10, 17, 0, 0, 0, 0), 800),
        ];

        let today = filter_by_day_at(&orders, DaySelector::Today, &now);
        assert_eq!(grand_total(&today), Money::from_major(300));

        let yesterday = filter_by_day_at(&orders, DaySelector::Yesterday, &now);
        assert_eq!(grand_total(&yesterday), Money::from_major(400));
    }

    #[test]
    fn test_days_ago_window() {
        let now = ist().with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let orders = vec![order_at(local(2026, 10, 13, 12, 0, 0, 0), 50)];
        assert_eq!(filter_by_day_at(&orders, DaySelector::DaysAgo(3), &now).len(), 1);
        assert!(filter_by_day_at(&orders, DaySelector::DaysAgo(2), &now).is_empty());
    }

    fn aggregator(remote: Arc<FakeRemote>, grant: FeatureGrant) -> (OrderHistoryAggregator, Arc<OfflineOrderQueue>) {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let queue = Arc::new(OfflineOrderQueue::new(store.clone()));
        (
            OrderHistoryAggregator::new(remote, store, queue.clone(), grant),
            queue,
        )
    }

    #[tokio::test]
    async fn test_load_falls_back_to_cache_and_queue() {
        let remote = Arc::new(FakeRemote::new());
        let (history, queue) = aggregator(remote.clone(), FeatureGrant::basic());

        let acked = order_at(Utc::now(), 100);
        remote.submit_order(&acked).await.unwrap();
        assert_eq!(history.load().await.source, Source::Remote);

        remote.set_online(false).await;
        let offline = order_at(Utc::now(), 40);
        queue.enqueue(&offline).await.unwrap();

        let view = history.load().await;
        assert_eq!(view.source, Source::Cache);
        let ids: Vec<&OrderId> = view.orders.iter().map(|o| &o.id).collect();
        assert_eq!(ids, vec![&acked.id, &offline.id]);
    }

    #[tokio::test]
    async fn test_recent_totals_cover_each_day() {
        let remote = Arc::new(FakeRemote::new());
        let (history, _) = aggregator(remote.clone(), FeatureGrant::basic());
        let now = ist().with_ymd_and_hms(2026, 10, 16, 18, 0, 0).unwrap();
        remote
            .submit_order(&order_at(local(2026, 10, 16, 10, 0, 0, 0), 120))
            .await
            .unwrap();
        remote
            .submit_order(&order_at(local(2026, 10, 14, 10, 0, 0, 0), 80))
            .await
            .unwrap();

        let totals = history.recent_totals_at(3, &now).await;
        assert_eq!(
            totals,
            vec![
                (DaySelector::Today, Money::from_major(120)),
                (DaySelector::Yesterday, Money::ZERO),
                (DaySelector::DaysAgo(2), Money::from_major(80)),
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_order_requires_grant() {
        let remote = Arc::new(FakeRemote::new());
        let order = order_at(Utc::now(), 100);
        remote.submit_order(&order).await.unwrap();

        let (basic, _) = aggregator(remote.clone(), FeatureGrant::basic());
        let result = basic.remove_order(&order.id).await;
        assert!(matches!(result, Err(TillError::PermissionDenied(_))));
        assert_eq!(remote.orders().await.len(), 1);

        let (advanced, _) = aggregator(remote.clone(), FeatureGrant::advanced());
        advanced.refresh().await.unwrap();
        advanced.remove_order(&order.id).await.unwrap();
        assert!(remote.orders().await.is_empty());
        assert!(advanced.store.get(Collection::OrderHistory, order.id.as_str()).await.unwrap().is_none());
    }
}
