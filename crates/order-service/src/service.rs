//! Order service coordinating validation, persistence, and the live view.

use std::sync::Arc;

use chrono::NaiveDate;
use common::OrderId;
use domain::{CustomerId, Order, OrderError, OrderState};
use liveview::LiveOrderIndex;
use order_store::OrderStore;

use crate::error::ServiceError;

/// Service for managing orders.
///
/// Every mutation follows the same ordering rule: the store write completes
/// first, and only a confirmed write is published into the live index. On
/// any store failure the index is left untouched — it may lag durable state
/// but never runs ahead of it. The index lock is never held across store
/// I/O; all index mutations here happen strictly after the await on the
/// store returns.
pub struct OrderService<S: OrderStore> {
    store: S,
    index: Arc<LiveOrderIndex>,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service over the given store and live index.
    pub fn new(store: S, index: Arc<LiveOrderIndex>) -> Self {
        Self { store, index }
    }

    /// Returns the live index this service publishes into.
    pub fn index(&self) -> &Arc<LiveOrderIndex> {
        &self.index
    }

    /// Primes the live index with a full snapshot from the store.
    ///
    /// Safe to call from several startup paths at once; only the first
    /// caller populates the index. Returns whether this call populated it.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_all(&self) -> Result<bool, ServiceError> {
        let orders = self.store.find_all().await?;
        Ok(self.index.initialize(orders).await)
    }

    /// Creates a new order.
    ///
    /// The order must not carry an id and must contain at least one item.
    /// Returns the persisted order with its assigned id and version.
    #[tracing::instrument(skip(self, order))]
    pub async fn create_order(&self, mut order: Order) -> Result<Order, ServiceError> {
        if order.id().is_some() {
            return Err(ServiceError::Validation {
                reason: "a new order must not carry an id",
            });
        }
        if order.items().is_empty() {
            return Err(ServiceError::Validation {
                reason: "an order must contain at least one item",
            });
        }

        order.recalculate_total();
        let saved = self.store.save(order).await?;
        self.index.upsert(saved.clone()).await;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = ?saved.id(), total = %saved.total_price(), "order created");
        Ok(saved)
    }

    /// Updates an existing order.
    ///
    /// The order must carry the id of a stored order and the version it was
    /// loaded at; a stale version surfaces as a store conflict. The index
    /// receives the copy re-read from the store after the write, never the
    /// caller's object, so store-applied changes (the version bump) are
    /// what observers see.
    #[tracing::instrument(skip(self, order))]
    pub async fn update_order(&self, mut order: Order) -> Result<Order, ServiceError> {
        let id = order.id().ok_or(ServiceError::Validation {
            reason: "an order id is required for update",
        })?;
        if !self.store.exists_by_id(id).await? {
            return Err(ServiceError::NotFound(id));
        }

        order.recalculate_total();
        let saved = self.store.save(order).await?;
        self.republish(id).await?;
        Ok(saved)
    }

    /// Marks a `New` order as `Ready`.
    #[tracing::instrument(skip(self))]
    pub async fn mark_ready(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.transition(id, Order::mark_ready).await
    }

    /// Marks a `Ready` order as `Delivered`.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.transition(id, Order::mark_delivered).await
    }

    /// Cancels a `New` or `Ready` order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.transition(id, Order::cancel).await
    }

    /// Deletes an order.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<(), ServiceError> {
        if !self.store.exists_by_id(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        self.store.delete_by_id(id).await?;
        self.index.remove(id).await;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    /// Loads the order, applies the aggregate transition, persists, and
    /// republishes the stored copy. Aggregate rejections propagate verbatim.
    async fn transition(
        &self,
        id: OrderId,
        apply: fn(&mut Order) -> Result<(), OrderError>,
    ) -> Result<Order, ServiceError> {
        let mut order = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;

        apply(&mut order)?;
        let saved = self.store.save(order).await?;
        self.republish(id).await?;

        metrics::counter!("order_state_transitions_total").increment(1);
        tracing::info!(order_id = %id, state = %saved.state(), "order state changed");
        Ok(saved)
    }

    /// Re-reads the persisted row and pushes that fresh copy into the index,
    /// or drops the id from the index if the row has vanished.
    async fn republish(&self, id: OrderId) -> Result<(), ServiceError> {
        match self.store.find_by_id(id).await? {
            Some(fresh) => self.index.upsert(fresh).await,
            None => self.index.remove(id).await,
        }
        Ok(())
    }
}

// Read-only queries: straight pass-through to the store.
impl<S: OrderStore> OrderService<S> {
    /// Retrieves all orders.
    pub async fn find_all(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.find_all().await?)
    }

    /// Retrieves an order by id.
    pub async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, ServiceError> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// Retrieves orders in the given lifecycle state.
    pub async fn find_by_state(&self, state: OrderState) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.find_by_state(state).await?)
    }

    /// Retrieves orders due on the given date.
    pub async fn find_by_due_date(&self, due: NaiveDate) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.find_by_due_date(due).await?)
    }

    /// Retrieves orders due within the given inclusive date range.
    pub async fn find_by_due_date_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.find_by_due_date_between(start, end).await?)
    }

    /// Retrieves orders placed by the given customer.
    pub async fn find_by_customer_id(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.find_by_customer_id(customer_id).await?)
    }

    /// Returns the total number of orders.
    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(self.store.count().await?)
    }

    /// Returns the number of orders in the given lifecycle state.
    pub async fn count_by_state(&self, state: OrderState) -> Result<u64, ServiceError> {
        Ok(self.store.count_by_state(state).await?)
    }

    /// Returns the number of orders due on the given date.
    pub async fn count_by_due_date(&self, due: NaiveDate) -> Result<u64, ServiceError> {
        Ok(self.store.count_by_due_date(due).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Version;
    use domain::{Money, OrderItem, PickupLocation};
    use order_store::{InMemoryOrderStore, StoreError};

    fn setup() -> OrderService<InMemoryOrderStore> {
        OrderService::new(InMemoryOrderStore::new(), Arc::new(LiveOrderIndex::new()))
    }

    fn draft_order() -> Order {
        let mut order = Order::new(
            NaiveDate::from_ymd_opt(2026, 8, 12).unwrap(),
            CustomerId::new(),
            PickupLocation::Storefront,
        );
        order
            .add_item(OrderItem::new("SKU-001", 2, Money::from_cents(1000)))
            .unwrap();
        order
    }

    #[tokio::test]
    async fn test_create_order_persists_and_indexes() {
        let service = setup();
        let saved = service.create_order(draft_order()).await.unwrap();

        assert!(saved.id().is_some());
        assert_eq!(saved.version(), Version::initial());
        assert_eq!(saved.total_price().cents(), 2000);
        assert_eq!(service.count().await.unwrap(), 1);

        let snapshot = service.index().snapshot();
        assert!(snapshot.contains(saved.id().unwrap()));
    }

    #[tokio::test]
    async fn test_create_order_with_preset_id_never_reaches_store() {
        let service = setup();
        let mut order = draft_order();
        order.assign_id(OrderId::new());

        let result = service.create_order(order).await;
        assert!(matches!(result, Err(ServiceError::Validation { .. })));
        assert_eq!(service.count().await.unwrap(), 0);
        assert!(service.index().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_create_order_requires_items() {
        let service = setup();
        let order = Order::new(
            NaiveDate::from_ymd_opt(2026, 8, 12).unwrap(),
            CustomerId::new(),
            PickupLocation::Storefront,
        );

        let result = service.create_order(order).await;
        assert!(matches!(result, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_order_requires_id() {
        let service = setup();
        let result = service.update_order(draft_order()).await;
        assert!(matches!(result, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_unknown_order_fails_and_index_untouched() {
        let service = setup();
        let mut order = draft_order();
        order.assign_id(OrderId::new());

        let result = service.update_order(order).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(service.index().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_update_publishes_fresh_store_copy() {
        let service = setup();
        let mut saved = service.create_order(draft_order()).await.unwrap();
        let id = saved.id().unwrap();

        saved.set_discount(Money::from_cents(500));
        let updated = service.update_order(saved).await.unwrap();
        assert_eq!(updated.version(), Version::new(1));

        // The indexed copy carries the store-applied version bump.
        let snapshot = service.index().snapshot();
        let indexed = snapshot.get(id).unwrap();
        assert_eq!(indexed.version(), Version::new(1));
        assert_eq!(indexed.total_price().cents(), 1500);
    }

    #[tokio::test]
    async fn test_transitions_follow_state_machine() {
        let service = setup();
        let saved = service.create_order(draft_order()).await.unwrap();
        let id = saved.id().unwrap();

        let ready = service.mark_ready(id).await.unwrap();
        assert_eq!(ready.state(), OrderState::Ready);

        let delivered = service.mark_delivered(id).await.unwrap();
        assert_eq!(delivered.state(), OrderState::Delivered);

        let result = service.cancel_order(id).await;
        assert!(matches!(
            result,
            Err(ServiceError::Order(OrderError::InvalidStateTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_transition_on_unknown_id_fails() {
        let service = setup();
        let result = service.mark_ready(OrderId::new()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(service.index().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failed_transition_leaves_store_and_index_unchanged() {
        let service = setup();
        let saved = service.create_order(draft_order()).await.unwrap();
        let id = saved.id().unwrap();

        let result = service.mark_delivered(id).await;
        assert!(matches!(result, Err(ServiceError::Order(_))));

        let stored = service.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.state(), OrderState::New);
        assert_eq!(stored.version(), Version::initial());

        let snapshot = service.index().snapshot();
        assert_eq!(snapshot.get(id).unwrap().state(), OrderState::New);
    }

    #[tokio::test]
    async fn test_stale_version_conflict_surfaces_unchanged() {
        let service = setup();
        let saved = service.create_order(draft_order()).await.unwrap();

        let mut first = saved.clone();
        first.set_discount(Money::from_cents(100));
        service.update_order(first).await.unwrap();

        let mut stale = saved;
        stale.set_discount(Money::from_cents(200));
        let result = service.update_order(stale).await;
        assert!(matches!(
            result,
            Err(ServiceError::Store(StoreError::Conflict { .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_order_removes_everywhere() {
        let service = setup();
        let saved = service.create_order(draft_order()).await.unwrap();
        let id = saved.id().unwrap();

        service.delete_order(id).await.unwrap();
        assert_eq!(service.count().await.unwrap(), 0);
        assert!(service.index().snapshot().is_empty());

        let result = service.delete_order(id).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_all_is_idempotent() {
        let store = InMemoryOrderStore::new();
        let index = Arc::new(LiveOrderIndex::new());
        let service = OrderService::new(store.clone(), Arc::clone(&index));

        service.create_order(draft_order()).await.unwrap();

        // A second service over the same store simulates a fresh startup path.
        let other = OrderService::new(store, Arc::new(LiveOrderIndex::new()));
        other.create_order(draft_order()).await.unwrap();

        index.reset().await;
        assert!(service.refresh_all().await.unwrap());
        assert!(!service.refresh_all().await.unwrap());
        assert_eq!(index.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_queries_pass_through() {
        let service = setup();
        let saved = service.create_order(draft_order()).await.unwrap();
        let due = saved.due_date();

        assert_eq!(service.find_all().await.unwrap().len(), 1);
        assert_eq!(
            service
                .find_by_state(OrderState::New)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(service.find_by_due_date(due).await.unwrap().len(), 1);
        assert_eq!(
            service
                .find_by_due_date_between(due, due)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            service
                .find_by_customer_id(saved.customer_id())
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(service.count_by_state(OrderState::New).await.unwrap(), 1);
        assert_eq!(service.count_by_due_date(due).await.unwrap(), 1);
    }
}
