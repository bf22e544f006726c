//! # Order Repository
//!
//! Storage for orders and their lines.
//!
//! Status changes go through [`OrderStateMachine`](crate::OrderStateMachine);
//! this module only exposes reads publicly. The write helpers take the
//! caller's transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult, EngineResult};
use stockyard_core::{CoreError, Order, OrderDetail, OrderLine, OrderStatus, Page};

/// Read access to orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, status, created_at, updated_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order together with its lines.
    pub async fn get_detail(&self, id: i64) -> DbResult<Option<OrderDetail>> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let lines = self.lines(id).await?;
        Ok(Some(OrderDetail { order, lines }))
    }

    /// Lines of an order in insertion order.
    pub async fn lines(&self, order_id: i64) -> DbResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            "SELECT id, order_id, sku, quantity FROM order_lines WHERE order_id = ?1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists orders newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<OrderStatus>, page: Page) -> DbResult<Vec<Order>> {
        debug!(status = ?status, limit = page.limit, offset = page.offset, "Listing orders");

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, status, created_at, updated_at
            FROM orders
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Takes the write lock, then reads the order.
pub(crate) async fn lock_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> EngineResult<Order> {
    let touched = sqlx::query("UPDATE orders SET updated_at = updated_at WHERE id = ?1")
        .bind(order_id)
        .execute(&mut **tx)
        .await?;

    if touched.rows_affected() == 0 {
        return Err(CoreError::OrderNotFound(order_id).into());
    }

    let order = sqlx::query_as::<_, Order>(
        "SELECT id, order_number, status, created_at, updated_at FROM orders WHERE id = ?1",
    )
    .bind(order_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(order)
}

/// Inserts a pending order.
///
/// A reused order number surfaces as `DuplicateOrderNumber`.
pub(crate) async fn insert_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_number: &str,
) -> EngineResult<Order> {
    let now = Utc::now();

    let result = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (order_number, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        RETURNING id, order_number, status, created_at, updated_at
        "#,
    )
    .bind(order_number)
    .bind(OrderStatus::Pending)
    .bind(now)
    .fetch_one(&mut **tx)
    .await;

    match result {
        Ok(order) => Ok(order),
        Err(err) => match DbError::from(err) {
            DbError::UniqueViolation { .. } => {
                Err(CoreError::DuplicateOrderNumber(order_number.to_string()).into())
            }
            other => Err(other.into()),
        },
    }
}

pub(crate) async fn insert_line(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    sku: &str,
    quantity: i64,
) -> DbResult<OrderLine> {
    let line = sqlx::query_as::<_, OrderLine>(
        r#"
        INSERT INTO order_lines (order_id, sku, quantity, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, order_id, sku, quantity
        "#,
    )
    .bind(order_id)
    .bind(sku)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await?;

    Ok(line)
}

pub(crate) async fn lines_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> DbResult<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>(
        "SELECT id, order_id, sku, quantity FROM order_lines WHERE order_id = ?1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(lines)
}

pub(crate) async fn set_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    status: OrderStatus,
) -> DbResult<Order> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET status = ?2, updated_at = ?3
        WHERE id = ?1
        RETURNING id, order_number, status, created_at, updated_at
        "#,
    )
    .bind(order_id)
    .bind(status)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await?;

    Ok(order)
}

/// Removes an order; its lines go with it (ON DELETE CASCADE).
pub(crate) async fn delete_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
        .bind(order_id)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id.to_string()));
    }

    Ok(())
}
