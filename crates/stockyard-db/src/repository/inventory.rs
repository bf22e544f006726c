//! # Inventory Ledger
//!
//! Per-SKU stock records and their append-only movement history.
//!
//! ## Row Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Locked Read of an InventoryItem                      │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    UPDATE inventory_items SET updated_at = updated_at WHERE sku = ?    │
//! │       │   (a write: this connection now holds the writer lock;         │
//! │       │    competitors wait on busy_timeout)                           │
//! │       ▼                                                                 │
//! │    SELECT ... WHERE sku = ?      ← values nobody else can change       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │    validate → mutate → append movement                                 │
//! │  COMMIT / ROLLBACK                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pool-level methods on [`InventoryLedger`] are plain reads. The free
//! functions take the caller's transaction and are only used by the
//! engine services, which own locking order.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbResult, EngineResult};
use stockyard_core::{CoreError, InventoryItem, MovementRecord, MovementType, NewInventoryItem, Page};

/// Read access to inventory and movement history.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.inventory();
/// let item = ledger.get_by_sku("BOLT-M8").await?;
/// let history = ledger.movements("BOLT-M8", Page::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    /// Creates a new InventoryLedger.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    /// Gets an item by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, sku, product_name, on_hand, reserved, created_at, updated_at
            FROM inventory_items
            WHERE sku = ?1
            "#,
        )
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists items ordered by SKU, optionally filtered by a substring of
    /// the SKU or product name.
    pub async fn list(&self, search: &str, page: Page) -> DbResult<Vec<InventoryItem>> {
        let search = search.trim();

        debug!(search = %search, limit = page.limit, offset = page.offset, "Listing inventory");

        let pattern = format!("%{}%", search);

        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, sku, product_name, on_hand, reserved, created_at, updated_at
            FROM inventory_items
            WHERE ?1 = '' OR sku LIKE ?2 OR product_name LIKE ?2
            ORDER BY sku
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(search)
        .bind(pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Movement history of a SKU, newest first.
    pub async fn movements(&self, sku: &str, page: Page) -> DbResult<Vec<MovementRecord>> {
        let movements = sqlx::query_as::<_, MovementRecord>(
            r#"
            SELECT id, sku, movement_type, quantity, order_id, actor, created_at
            FROM inventory_movements
            WHERE sku = ?1
            ORDER BY id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(sku.trim())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Counts items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Takes the write lock for a SKU and reads it.
///
/// ## Returns
/// * `Ok(None)` - no such SKU (the lock is still held for the transaction)
pub(crate) async fn try_lock_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku: &str,
) -> DbResult<Option<InventoryItem>> {
    let touched = sqlx::query("UPDATE inventory_items SET updated_at = updated_at WHERE sku = ?1")
        .bind(sku)
        .execute(&mut **tx)
        .await?;

    if touched.rows_affected() == 0 {
        return Ok(None);
    }

    let item = sqlx::query_as::<_, InventoryItem>(
        r#"
        SELECT id, sku, product_name, on_hand, reserved, created_at, updated_at
        FROM inventory_items
        WHERE sku = ?1
        "#,
    )
    .bind(sku)
    .fetch_one(&mut **tx)
    .await?;

    Ok(Some(item))
}

/// Like [`try_lock_item`], but an unknown SKU is an error.
pub(crate) async fn lock_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku: &str,
) -> EngineResult<InventoryItem> {
    try_lock_item(tx, sku)
        .await?
        .ok_or_else(|| CoreError::SkuNotFound(sku.to_string()).into())
}

/// Applies signed deltas to a locked row and returns the new values.
///
/// Callers check the deltas against the locked values first; the CHECK
/// constraints only catch bugs.
pub(crate) async fn apply_delta(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku: &str,
    on_hand_delta: i64,
    reserved_delta: i64,
) -> DbResult<InventoryItem> {
    debug!(sku = %sku, on_hand_delta, reserved_delta, "Applying stock delta");

    let item = sqlx::query_as::<_, InventoryItem>(
        r#"
        UPDATE inventory_items
        SET
            on_hand = on_hand + ?2,
            reserved = reserved + ?3,
            updated_at = ?4
        WHERE sku = ?1
        RETURNING id, sku, product_name, on_hand, reserved, created_at, updated_at
        "#,
    )
    .bind(sku)
    .bind(on_hand_delta)
    .bind(reserved_delta)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await?;

    Ok(item)
}

/// Inserts a new stock record with zero reserved.
pub(crate) async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    item: &NewInventoryItem,
) -> DbResult<InventoryItem> {
    let now = Utc::now();

    let item = sqlx::query_as::<_, InventoryItem>(
        r#"
        INSERT INTO inventory_items (sku, product_name, on_hand, reserved, created_at, updated_at)
        VALUES (?1, ?2, ?3, 0, ?4, ?4)
        RETURNING id, sku, product_name, on_hand, reserved, created_at, updated_at
        "#,
    )
    .bind(item.sku.trim())
    .bind(item.product_name.trim())
    .bind(item.on_hand)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    Ok(item)
}

/// Appends a movement record.
pub(crate) async fn insert_movement(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku: &str,
    movement_type: MovementType,
    quantity: i64,
    order_id: Option<i64>,
    actor: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (sku, movement_type, quantity, order_id, actor, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(sku)
    .bind(movement_type)
    .bind(quantity)
    .bind(order_id)
    .bind(actor)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Units of a SKU already picked against an order.
pub(crate) async fn picked_for_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    sku: &str,
) -> DbResult<i64> {
    let picked: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(quantity), 0)
        FROM inventory_movements
        WHERE order_id = ?1 AND sku = ?2 AND movement_type = 'outbound'
        "#,
    )
    .bind(order_id)
    .bind(sku)
    .fetch_one(&mut **tx)
    .await?;

    Ok(picked)
}

// =============================================================================
// Unit Tests
// =============================================================================
