//! Derived order statistics.

use chrono::NaiveDate;
use domain::{Order, OrderState};
use tokio::sync::watch;

/// Counts derived from a full scan of the live order set.
///
/// A full recompute per mutation is deliberate: it cannot drift the way
/// incrementally maintained counters can, and the live set is small enough
/// that the scan cost is negligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderStats {
    /// Orders due on the day the stats were computed.
    pub due_today: u64,
    /// Orders in the `New` state.
    pub new_orders: u64,
    /// Orders in the `Ready` state.
    pub ready: u64,
    /// Orders in the `Delivered` state.
    pub delivered: u64,
    /// Orders in the `Cancelled` state.
    pub cancelled: u64,
}

impl OrderStats {
    /// Computes stats from the given orders, with "today" evaluated by the
    /// caller at recomputation time.
    pub fn compute<'a>(orders: impl IntoIterator<Item = &'a Order>, today: NaiveDate) -> Self {
        let mut stats = OrderStats::default();
        for order in orders {
            match order.state() {
                OrderState::New => stats.new_orders += 1,
                OrderState::Ready => stats.ready += 1,
                OrderState::Delivered => stats.delivered += 1,
                OrderState::Cancelled => stats.cancelled += 1,
            }
            if order.due_date() == today {
                stats.due_today += 1;
            }
        }
        stats
    }

    /// Returns the count for a single lifecycle state.
    pub fn count_by_state(&self, state: OrderState) -> u64 {
        match state {
            OrderState::New => self.new_orders,
            OrderState::Ready => self.ready,
            OrderState::Delivered => self.delivered,
            OrderState::Cancelled => self.cancelled,
        }
    }

    /// Returns the total number of orders counted.
    pub fn total(&self) -> u64 {
        self.new_orders + self.ready + self.delivered + self.cancelled
    }
}

/// Per-statistic observable channels.
///
/// Each count is published on its own watch channel so a subscriber
/// interested in a single number (say, the Ready count on a dashboard tile)
/// does not have to diff full snapshots itself.
pub struct StatsBoard {
    due_today: watch::Sender<u64>,
    new_orders: watch::Sender<u64>,
    ready: watch::Sender<u64>,
    delivered: watch::Sender<u64>,
    cancelled: watch::Sender<u64>,
}

impl StatsBoard {
    pub(crate) fn new() -> Self {
        Self {
            due_today: watch::channel(0).0,
            new_orders: watch::channel(0).0,
            ready: watch::channel(0).0,
            delivered: watch::channel(0).0,
            cancelled: watch::channel(0).0,
        }
    }

    /// Publishes a freshly computed set of counts.
    pub(crate) fn publish(&self, stats: OrderStats) {
        self.due_today.send_replace(stats.due_today);
        self.new_orders.send_replace(stats.new_orders);
        self.ready.send_replace(stats.ready);
        self.delivered.send_replace(stats.delivered);
        self.cancelled.send_replace(stats.cancelled);
    }

    /// Observes the count of orders due today.
    pub fn due_today(&self) -> watch::Receiver<u64> {
        self.due_today.subscribe()
    }

    /// Observes the count of `New` orders.
    pub fn new_orders(&self) -> watch::Receiver<u64> {
        self.new_orders.subscribe()
    }

    /// Observes the count of `Ready` orders.
    pub fn ready(&self) -> watch::Receiver<u64> {
        self.ready.subscribe()
    }

    /// Observes the count of `Delivered` orders.
    pub fn delivered(&self) -> watch::Receiver<u64> {
        self.delivered.subscribe()
    }

    /// Observes the count of `Cancelled` orders.
    pub fn cancelled(&self) -> watch::Receiver<u64> {
        self.cancelled.subscribe()
    }

    /// Observes the count for a single lifecycle state.
    pub fn by_state(&self, state: OrderState) -> watch::Receiver<u64> {
        match state {
            OrderState::New => self.new_orders(),
            OrderState::Ready => self.ready(),
            OrderState::Delivered => self.delivered(),
            OrderState::Cancelled => self.cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CustomerId, Money, OrderItem, PickupLocation};

    fn order(due: NaiveDate, state: OrderState) -> Order {
        let mut order = Order::new(due, CustomerId::new(), PickupLocation::Storefront);
        order
            .add_item(OrderItem::new("SKU-001", 1, Money::from_cents(500)))
            .unwrap();
        match state {
            OrderState::New => {}
            OrderState::Ready => order.mark_ready().unwrap(),
            OrderState::Delivered => {
                order.mark_ready().unwrap();
                order.mark_delivered().unwrap();
            }
            OrderState::Cancelled => order.cancel().unwrap(),
        }
        order
    }

    #[test]
    fn test_compute_counts_states_and_due_today() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let tomorrow = today.succ_opt().unwrap();

        let orders = vec![
            order(today, OrderState::New),
            order(today, OrderState::Ready),
            order(tomorrow, OrderState::Ready),
            order(tomorrow, OrderState::Delivered),
            order(today, OrderState::Cancelled),
        ];

        let stats = OrderStats::compute(orders.iter(), today);
        assert_eq!(stats.new_orders, 1);
        assert_eq!(stats.ready, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.due_today, 3);
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn test_count_by_state_matches_fields() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let orders = vec![order(today, OrderState::Ready), order(today, OrderState::Ready)];
        let stats = OrderStats::compute(orders.iter(), today);

        assert_eq!(stats.count_by_state(OrderState::Ready), 2);
        assert_eq!(stats.count_by_state(OrderState::New), 0);
    }

    #[test]
    fn test_empty_set_yields_zeroes() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let stats = OrderStats::compute(std::iter::empty(), today);
        assert_eq!(stats, OrderStats::default());
    }

    #[tokio::test]
    async fn test_board_publishes_independent_counts() {
        let board = StatsBoard::new();
        let ready = board.ready();
        let due_today = board.due_today();

        board.publish(OrderStats {
            ready: 3,
            due_today: 1,
            ..OrderStats::default()
        });

        assert_eq!(*ready.borrow(), 3);
        assert_eq!(*due_today.borrow(), 1);
        assert_eq!(*board.by_state(OrderState::Cancelled).borrow(), 0);
    }
}
