//! The live order index.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use common::OrderId;
use domain::Order;
use tokio::sync::{Mutex, watch};

use crate::stats::{OrderStats, StatsBoard};

/// Callback invoked after every content mutation with the resulting snapshot.
pub type Listener = Box<dyn Fn(&OrderSnapshot) + Send + Sync>;

/// Opaque handle returned by [`LiveOrderIndex::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An immutable point-in-time view of the live order set.
///
/// Cloning is cheap (the order map is shared behind an `Arc`). The stats
/// were computed from exactly the map carried here, so the two can never
/// disagree.
#[derive(Clone)]
pub struct OrderSnapshot {
    orders: Arc<HashMap<OrderId, Order>>,
    stats: OrderStats,
}

impl OrderSnapshot {
    fn empty() -> Self {
        Self {
            orders: Arc::new(HashMap::new()),
            stats: OrderStats::default(),
        }
    }

    /// Returns the order with the given id, if present.
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// Returns true if the snapshot contains the given id.
    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    /// Iterates over all orders in the snapshot.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Returns the number of orders in the snapshot.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns true if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns the stats computed from this snapshot.
    pub fn stats(&self) -> OrderStats {
        self.stats
    }
}

struct IndexInner {
    orders: HashMap<OrderId, Order>,
    initialized: bool,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

/// Process-wide, concurrently readable mirror of persisted orders.
///
/// All mutations run under a single lock, giving the mutation history one
/// linear order across every caller: no lost updates, and every observer
/// converges on the same final state. Readers never take that lock — each
/// mutation publishes a fresh [`OrderSnapshot`] through a watch channel, so
/// [`snapshot`](Self::snapshot) is a cheap borrow-and-clone that can run
/// while a writer holds the critical section.
///
/// The index is a read-optimized cache of confirmed durable state, never the
/// source of truth. Callers must complete their store write before touching
/// the index, and must not publish anything the store has not acknowledged.
///
/// Construct one index at process start and inject it everywhere it is
/// observed; see [`reset`](Self::reset) for the test-only escape hatch.
pub struct LiveOrderIndex {
    inner: Mutex<IndexInner>,
    published: watch::Sender<OrderSnapshot>,
    counts: StatsBoard,
}

impl LiveOrderIndex {
    /// Creates a new, empty, uninitialized index.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(IndexInner {
                orders: HashMap::new(),
                initialized: false,
                listeners: Vec::new(),
                next_subscription: 0,
            }),
            published: watch::channel(OrderSnapshot::empty()).0,
            counts: StatsBoard::new(),
        }
    }

    /// Populates the index from a full store snapshot.
    ///
    /// Idempotent under concurrent callers: the initialized flag is read and
    /// set inside the same critical section, so exactly one caller populates
    /// the index and every other caller returns `false` without effect.
    /// [`reset`](Self::reset) re-arms initialization.
    pub async fn initialize(&self, orders: Vec<Order>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.initialized {
            tracing::debug!("live order index already initialized");
            return false;
        }
        inner.orders = Self::keyed(orders);
        inner.initialized = true;
        tracing::info!(orders = inner.orders.len(), "live order index initialized");
        self.publish(&inner);
        true
    }

    /// Clears the index and re-arms initialization.
    ///
    /// Intended for test isolation only; production code initializes the
    /// index exactly once at composition time.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.orders.clear();
        inner.initialized = false;
        self.publish(&inner);
    }

    /// Inserts the order, or overwrites the existing entry with the same id.
    ///
    /// Orders that have never been persisted (no id) are refused: the index
    /// only mirrors confirmed durable state.
    pub async fn upsert(&self, order: Order) {
        let Some(id) = order.id() else {
            tracing::warn!("refusing to index an order without an id");
            return;
        };
        let mut inner = self.inner.lock().await;
        inner.orders.insert(id, order);
        self.publish(&inner);
    }

    /// Removes the entry for `id`. Removing an absent id is a no-op.
    pub async fn remove(&self, id: OrderId) {
        let mut inner = self.inner.lock().await;
        if inner.orders.remove(&id).is_some() {
            self.publish(&inner);
        }
    }

    /// Atomically replaces the entire contents with exactly the given set.
    ///
    /// The replacement is a single swap of the published snapshot: a
    /// concurrent reader sees either the complete old set or the complete
    /// new set, never a partially rebuilt one.
    pub async fn rebuild(&self, orders: Vec<Order>) {
        let mut inner = self.inner.lock().await;
        inner.orders = Self::keyed(orders);
        inner.initialized = true;
        self.publish(&inner);
    }

    /// Returns a consistent, immutable point-in-time view of the contents.
    ///
    /// Never blocks behind a mutation in progress: the previously published
    /// snapshot stays available until the writer publishes its replacement.
    pub fn snapshot(&self) -> OrderSnapshot {
        self.published.borrow().clone()
    }

    /// Returns the stats computed alongside the current snapshot.
    pub fn stats(&self) -> OrderStats {
        self.published.borrow().stats()
    }

    /// Observes every published snapshot as a watch channel.
    pub fn watch(&self) -> watch::Receiver<OrderSnapshot> {
        self.published.subscribe()
    }

    /// Returns the per-statistic observable channels.
    pub fn counts(&self) -> &StatsBoard {
        &self.counts
    }

    /// Registers a listener invoked after every content mutation with the
    /// resulting snapshot (stats included).
    ///
    /// Listeners run inside the mutation critical section, in registration
    /// order, which makes delivery order per listener identical to the
    /// mutation total order. Keep them short; they must not call back into
    /// the index.
    pub async fn subscribe(&self, listener: impl Fn(&OrderSnapshot) + Send + Sync + 'static) -> SubscriptionId {
        let mut inner = self.inner.lock().await;
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.listeners.push((id, Box::new(listener)));
        id
    }

    /// Deregisters a listener. Returns true if the handle was registered.
    pub async fn unsubscribe(&self, handle: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().await;
        let before = inner.listeners.len();
        inner.listeners.retain(|(id, _)| *id != handle);
        inner.listeners.len() != before
    }

    fn keyed(orders: Vec<Order>) -> HashMap<OrderId, Order> {
        orders
            .into_iter()
            .filter_map(|order| match order.id() {
                Some(id) => Some((id, order)),
                None => {
                    tracing::warn!("refusing to index an order without an id");
                    None
                }
            })
            .collect()
    }

    /// Recomputes stats, publishes the new snapshot, and notifies listeners.
    ///
    /// Runs entirely inside the caller's critical section so the published
    /// stats always correspond to the published snapshot and listeners see
    /// mutations in their one total order.
    fn publish(&self, inner: &IndexInner) {
        let today = Local::now().date_naive();
        let stats = OrderStats::compute(inner.orders.values(), today);
        let snapshot = OrderSnapshot {
            orders: Arc::new(inner.orders.clone()),
            stats,
        };

        self.published.send_replace(snapshot.clone());
        self.counts.publish(stats);

        metrics::counter!("live_order_index_mutations_total").increment(1);
        metrics::gauge!("live_orders").set(inner.orders.len() as f64);

        for (_, listener) in &inner.listeners {
            listener(&snapshot);
        }
    }
}

impl Default for LiveOrderIndex {
    fn default() -> Self {
        Self::new()
    }
}
