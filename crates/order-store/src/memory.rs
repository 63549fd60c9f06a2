use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{OrderId, Version};
use domain::{CustomerId, Order, OrderState};
use tokio::sync::RwLock;

use crate::{Result, StoreError, store::OrderStore};

/// In-memory order store implementation for testing.
///
/// This implementation keeps all orders in memory and provides the same
/// interface and optimistic-concurrency behavior as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all stored orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, mut order: Order) -> Result<Order> {
        let mut orders = self.orders.write().await;

        match order.id() {
            None => {
                let id = OrderId::new();
                order.assign_id(id);
                order.set_version(Version::initial());
                orders.insert(id, order.clone());
                Ok(order)
            }
            Some(id) => {
                let stored = orders.get(&id).ok_or(StoreError::NotFound(id))?;
                if stored.version() != order.version() {
                    return Err(StoreError::Conflict {
                        order_id: id,
                        expected: order.version(),
                        actual: stored.version(),
                    });
                }
                order.set_version(order.version().next());
                orders.insert(id, order.clone());
                Ok(order)
            }
        }
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn exists_by_id(&self, id: OrderId) -> Result<bool> {
        Ok(self.orders.read().await.contains_key(&id))
    }

    async fn delete_by_id(&self, id: OrderId) -> Result<()> {
        self.orders.write().await.remove(&id);
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        Ok(self.orders.read().await.values().cloned().collect())
    }

    async fn find_by_state(&self, state: OrderState) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.state() == state)
            .cloned()
            .collect())
    }

    async fn find_by_due_date(&self, due: NaiveDate) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.due_date() == due)
            .cloned()
            .collect())
    }

    async fn find_by_due_date_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.due_date() >= start && o.due_date() <= end)
            .cloned()
            .collect())
    }

    async fn find_by_customer_id(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.customer_id() == customer_id)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.orders.read().await.len() as u64)
    }

    async fn count_by_state(&self, state: OrderState) -> Result<u64> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.state() == state)
            .count() as u64)
    }

    async fn count_by_due_date(&self, due: NaiveDate) -> Result<u64> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.due_date() == due)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, OrderItem, PickupLocation};

    fn sample_order(due: NaiveDate) -> Order {
        let mut order = Order::new(due, CustomerId::new(), PickupLocation::Storefront);
        order
            .add_item(OrderItem::new("SKU-001", 2, Money::from_cents(1000)))
            .unwrap();
        order
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 12).unwrap()
    }

    #[tokio::test]
    async fn save_assigns_id_and_initial_version() {
        let store = InMemoryOrderStore::new();
        let saved = store.save(sample_order(due())).await.unwrap();

        assert!(saved.id().is_some());
        assert_eq!(saved.version(), Version::initial());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_bumps_version_on_update() {
        let store = InMemoryOrderStore::new();
        let mut saved = store.save(sample_order(due())).await.unwrap();

        saved.set_discount(Money::from_cents(100));
        let updated = store.save(saved).await.unwrap();
        assert_eq!(updated.version(), Version::new(1));

        let fetched = store.find_by_id(updated.id().unwrap()).await.unwrap();
        assert_eq!(fetched.unwrap().version(), Version::new(1));
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryOrderStore::new();
        let saved = store.save(sample_order(due())).await.unwrap();

        let stale = saved.clone();
        store.save(saved).await.unwrap(); // bumps stored version to 1

        let result = store.save(stale).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn update_of_unknown_id_fails() {
        let store = InMemoryOrderStore::new();
        let mut order = sample_order(due());
        order.assign_id(OrderId::new());

        let result = store.save(order).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_is_noop_for_unknown_id() {
        let store = InMemoryOrderStore::new();
        store.delete_by_id(OrderId::new()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_removes_order() {
        let store = InMemoryOrderStore::new();
        let saved = store.save(sample_order(due())).await.unwrap();
        let id = saved.id().unwrap();

        assert!(store.exists_by_id(id).await.unwrap());
        store.delete_by_id(id).await.unwrap();
        assert!(!store.exists_by_id(id).await.unwrap());
    }

    #[tokio::test]
    async fn queries_filter_by_state_due_date_and_customer() {
        let store = InMemoryOrderStore::new();
        let customer = CustomerId::new();

        let mut a = Order::new(due(), customer, PickupLocation::Storefront);
        a.add_item(OrderItem::new("SKU-001", 1, Money::from_cents(500)))
            .unwrap();
        let a = store.save(a).await.unwrap();

        let later = due().succ_opt().unwrap();
        let mut b = sample_order(later);
        b.mark_ready().unwrap();
        store.save(b).await.unwrap();

        let new_orders = store.find_by_state(OrderState::New).await.unwrap();
        assert_eq!(new_orders.len(), 1);
        assert_eq!(new_orders[0].id(), a.id());

        assert_eq!(store.find_by_due_date(due()).await.unwrap().len(), 1);
        assert_eq!(
            store
                .find_by_due_date_between(due(), later)
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            store.find_by_customer_id(customer).await.unwrap().len(),
            1
        );
        assert_eq!(store.count_by_state(OrderState::Ready).await.unwrap(), 1);
        assert_eq!(store.count_by_due_date(later).await.unwrap(), 1);
    }
}
