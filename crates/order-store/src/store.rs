use async_trait::async_trait;
use chrono::NaiveDate;
use common::OrderId;
use domain::{CustomerId, Order, OrderState};

use crate::Result;

/// Core trait for order store implementations.
///
/// The store exclusively owns durable order state. All implementations must
/// be thread-safe (Send + Sync) and provide their own isolation; optimistic
/// concurrency is enforced through the order's version token.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order.
    ///
    /// An order without an id is inserted: the store assigns a fresh id and
    /// version 0. An order with an id is updated: the carried version must
    /// equal the stored version or the call fails with
    /// [`StoreError::Conflict`](crate::StoreError::Conflict); on success the
    /// version is bumped by exactly one. Updating an unknown id fails with
    /// [`StoreError::NotFound`](crate::StoreError::NotFound).
    ///
    /// Returns the stored copy, carrying the assigned id and version.
    async fn save(&self, order: Order) -> Result<Order>;

    /// Retrieves an order by id. Returns None if absent.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns true if an order with the given id exists.
    async fn exists_by_id(&self, id: OrderId) -> Result<bool>;

    /// Deletes an order by id. Deleting an unknown id is a no-op.
    async fn delete_by_id(&self, id: OrderId) -> Result<()>;

    /// Retrieves all orders.
    async fn find_all(&self) -> Result<Vec<Order>>;

    /// Retrieves orders in the given lifecycle state.
    async fn find_by_state(&self, state: OrderState) -> Result<Vec<Order>>;

    /// Retrieves orders due on the given date.
    async fn find_by_due_date(&self, due: NaiveDate) -> Result<Vec<Order>>;

    /// Retrieves orders due within the given inclusive date range.
    async fn find_by_due_date_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>>;

    /// Retrieves orders placed by the given customer.
    async fn find_by_customer_id(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    /// Returns the total number of orders.
    async fn count(&self) -> Result<u64>;

    /// Returns the number of orders in the given lifecycle state.
    async fn count_by_state(&self, state: OrderState) -> Result<u64>;

    /// Returns the number of orders due on the given date.
    async fn count_by_due_date(&self, due: NaiveDate) -> Result<u64>;
}
