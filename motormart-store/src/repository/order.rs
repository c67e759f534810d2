//! Order Repository
//!
//! Plain reads and inserts go through [`OrderStore`]. Status changes go through
//! an [`OrderTransaction`] obtained from [`OrderStore::begin`]; every read and
//! write of that unit of work is issued on the transaction object, which is
//! released by `commit`, `abort`, or rolled back when dropped.

use async_trait::async_trait;
use motormart_core::domain::order::{Order, OrderStatus, RentalWindow};
use motormart_core::domain::product::Choice;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::PgStore;
use crate::error::{Result, StoreError, is_unique_violation};

/// Store-side visibility required for the reads of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConcern {
    /// Whatever the connection sees at statement time
    Local,
    /// A single snapshot of data committed and replicated to a majority
    Majority,
}

/// Acknowledgement required before a commit is reported durable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteConcern {
    /// Flushed on the primary
    Local,
    /// Applied on the synchronous replicas as well
    Majority,
}

/// Consistency settings applied when a transaction starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub read_concern: ReadConcern,
    pub write_concern: WriteConcern,
}

impl TxOptions {
    pub const MAJORITY: TxOptions = TxOptions {
        read_concern: ReadConcern::Majority,
        write_concern: WriteConcern::Majority,
    };

    fn isolation_statement(&self) -> &'static str {
        match self.read_concern {
            ReadConcern::Local => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            ReadConcern::Majority => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
        }
    }

    fn commit_statement(&self) -> &'static str {
        match self.write_concern {
            WriteConcern::Local => "SET LOCAL synchronous_commit TO local",
            WriteConcern::Majority => "SET LOCAL synchronous_commit TO remote_apply",
        }
    }
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            read_concern: ReadConcern::Local,
            write_concern: WriteConcern::Local,
        }
    }
}

/// Order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Find an order by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;

    /// Find the order a user placed for a product, if any
    async fn find_by_user_and_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Order>>;

    /// List a user's orders, oldest first
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

    /// Insert a new order
    ///
    /// Fails with [`StoreError::Conflict`] when the user already ordered the product.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Start a transactional session
    async fn begin(&self, options: TxOptions) -> Result<Box<dyn OrderTransaction>>;
}

/// A unit of work over orders
#[async_trait]
pub trait OrderTransaction: Send {
    /// Read an order and hold it against concurrent writers until the transaction ends
    async fn find_for_update(&mut self, id: Uuid) -> Result<Option<Order>>;

    /// Move an order from `expected` to `next`
    ///
    /// Returns `false`, writing nothing, when the order is not currently in `expected`.
    async fn update_status(
        &mut self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn abort(self: Box<Self>) -> Result<()>;
}

#[async_trait]
impl OrderStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, product_id, cart_id, status, choice, total_amount,
                   initial_time, end_time, rent_time, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_user_and_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, product_id, cart_id, status, choice, total_amount,
                   initial_time, end_time, rent_time, created_at
            FROM orders
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, product_id, cart_id, status, choice, total_amount,
                   initial_time, end_time, rent_time, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn insert(&self, order: &Order) -> Result<()> {
        let rental = order.rental;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, product_id, cart_id, status, choice, total_amount,
                                initial_time, end_time, rent_time, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.product_id)
        .bind(order.cart_id)
        .bind(order.status.as_str())
        .bind(order.choice.as_str())
        .bind(order.total_amount)
        .bind(rental.map(|r| r.initial_time))
        .bind(rental.map(|r| r.end_time))
        .bind(rental.map(|r| r.rent_time))
        .bind(order.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!(
                    "order already exists for user {} and product {}",
                    order.user_id, order.product_id
                ))
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn begin(&self, options: TxOptions) -> Result<Box<dyn OrderTransaction>> {
        let mut tx = self.pool().begin().await?;

        // Isolation must be set before the first query of the transaction
        sqlx::query(options.isolation_statement())
            .execute(&mut *tx)
            .await?;
        sqlx::query(options.commit_statement())
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgOrderTransaction { tx }))
    }
}

/// Postgres order transaction; rolls back when dropped uncommitted
struct PgOrderTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    async fn find_for_update(&mut self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, product_id, cart_id, status, choice, total_amount,
                   initial_time, end_time, rent_time, created_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn update_status(
        &mut self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND status = $3")
            .bind(next.as_str())
            .bind(id)
            .bind(expected.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    cart_id: Uuid,
    status: String,
    choice: String,
    total_amount: f64,
    initial_time: Option<i32>,
    end_time: Option<i32>,
    rent_time: Option<i32>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self> {
        let status = row.status.parse::<OrderStatus>().map_err(StoreError::Corrupt)?;
        let choice = row.choice.parse::<Choice>().map_err(StoreError::Corrupt)?;

        let rental = match (row.initial_time, row.end_time, row.rent_time) {
            (Some(initial_time), Some(end_time), Some(rent_time)) => Some(RentalWindow {
                initial_time,
                end_time,
                rent_time,
            }),
            _ => None,
        };

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            cart_id: row.cart_id,
            status,
            choice,
            total_amount: row.total_amount,
            rental,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_maps_to_snapshot_and_replicated_commit() {
        let options = TxOptions::MAJORITY;
        assert!(options.isolation_statement().ends_with("REPEATABLE READ"));
        assert!(options.commit_statement().ends_with("remote_apply"));
    }

    #[test]
    fn test_default_options_are_local() {
        let options = TxOptions::default();
        assert!(options.isolation_statement().ends_with("READ COMMITTED"));
        assert!(options.commit_statement().ends_with("local"));
    }

    #[test]
    fn test_row_without_rental_columns_is_sell_order() {
        let row = OrderRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            status: "Confirmed".to_string(),
            choice: "sell".to_string(),
            total_amount: 10.0,
            initial_time: None,
            end_time: None,
            rent_time: None,
            created_at: chrono::Utc::now(),
        };

        let order = Order::try_from(row).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.choice, Choice::Sell);
        assert!(order.rental.is_none());
    }

    #[test]
    fn test_row_with_unknown_status_is_corrupt() {
        let row = OrderRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            status: "Lost".to_string(),
            choice: "rent".to_string(),
            total_amount: 10.0,
            initial_time: Some(1),
            end_time: Some(2),
            rent_time: Some(1),
            created_at: chrono::Utc::now(),
        };

        assert!(matches!(Order::try_from(row), Err(StoreError::Corrupt(_))));
    }
}
