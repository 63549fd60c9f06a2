use async_trait::async_trait;
use chrono::NaiveDate;
use common::{OrderId, Version};
use domain::{CustomerId, Order, OrderState};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{Result, StoreError, store::OrderStore};

/// PostgreSQL-backed order store implementation.
///
/// Each order row carries indexed scalar columns for the filtered queries
/// plus the full order document as JSONB. Optimistic concurrency is enforced
/// with a version predicate on update.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let data: serde_json::Value = row.try_get("data")?;
        let order: Order = serde_json::from_value(data)?;
        Ok(order)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = ?order.id()))]
    async fn save(&self, mut order: Order) -> Result<Order> {
        match order.id() {
            None => {
                let id = OrderId::new();
                order.assign_id(id);
                order.set_version(Version::initial());
                let data = serde_json::to_value(&order)?;

                sqlx::query(
                    r#"
                    INSERT INTO orders (id, customer_id, state, due_date, version, data)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(id.as_uuid())
                .bind(order.customer_id().as_uuid())
                .bind(order.state().as_str())
                .bind(order.due_date())
                .bind(order.version().as_i64())
                .bind(&data)
                .execute(&self.pool)
                .await?;

                Ok(order)
            }
            Some(id) => {
                let expected = order.version();
                order.set_version(expected.next());
                let data = serde_json::to_value(&order)?;

                let result = sqlx::query(
                    r#"
                    UPDATE orders
                    SET customer_id = $3, state = $4, due_date = $5, version = $6, data = $7
                    WHERE id = $1 AND version = $2
                    "#,
                )
                .bind(id.as_uuid())
                .bind(expected.as_i64())
                .bind(order.customer_id().as_uuid())
                .bind(order.state().as_str())
                .bind(order.due_date())
                .bind(order.version().as_i64())
                .bind(&data)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    // Distinguish a stale version from a vanished row.
                    let actual: Option<i64> =
                        sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                            .bind(id.as_uuid())
                            .fetch_optional(&self.pool)
                            .await?;

                    return match actual {
                        Some(actual) => Err(StoreError::Conflict {
                            order_id: id,
                            expected,
                            actual: Version::new(actual),
                        }),
                        None => Err(StoreError::NotFound(id)),
                    };
                }

                Ok(order)
            }
        }
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT data FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn exists_by_id(&self, id: OrderId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn delete_by_id(&self, id: OrderId) -> Result<()> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT data FROM orders")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn find_by_state(&self, state: OrderState) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT data FROM orders WHERE state = $1")
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn find_by_due_date(&self, due: NaiveDate) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT data FROM orders WHERE due_date = $1")
            .bind(due)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn find_by_due_date_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT data FROM orders WHERE due_date BETWEEN $1 AND $2")
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn find_by_customer_id(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT data FROM orders WHERE customer_id = $1")
            .bind(customer_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_by_state(&self, state: OrderState) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE state = $1")
            .bind(state.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_by_due_date(&self, due: NaiveDate) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE due_date = $1")
            .bind(due)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
