//! # Reservation Manager
//!
//! The only code that changes `reserved`, and the one place where stock
//! rows are locked.
//!
//! ## Locking Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  reserve([(B,5), (A,1), (B,2)])                         │
//! │                                                                         │
//! │  1. Merge:     B=7, A=1          (first-appearance order kept)         │
//! │  2. Lock:      A, then B         (sorted: every writer agrees)         │
//! │  3. Validate:  B, then A         (caller order: first bad line wins)   │
//! │  4. Mutate:    reserved += n     (only if every check passed)          │
//! │                                                                         │
//! │  Any error → caller drops the transaction → nothing was applied        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transaction-level operations are associated functions taking the
//! caller's transaction, so order creation, shipment, scans and
//! cancellation all compose them into their own unit of work. The methods
//! on [`ReservationManager`] are standalone stock operations that open
//! their own transaction.

use std::collections::HashMap;

use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, EngineResult};
use crate::repository::audit::AuditRecorder;
use crate::repository::inventory;
use stockyard_core::reservation::{check_reservable, plan_adjustment, plan_pick, release_amount, ReservationBatch};
use stockyard_core::validation::{
    validate_actor, validate_counted_quantity, validate_note, validate_product_name,
    validate_quantity, validate_sku,
};
use stockyard_core::{
    AuditAction, AuditEntity, AuditRecord, CoreError, InventoryItem, MovementType,
    NewInventoryItem,
};

/// Stock reservation and movement operations.
///
/// ## Usage
/// ```rust,ignore
/// let stock = db.reservations();
/// stock.receive_stock("dock-2", "BOLT-M8", 50).await?;
/// stock.adjust_stock("auditor", "BOLT-M8", 148, Some("cycle count")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReservationManager {
    pool: SqlitePool,
}

impl ReservationManager {
    /// Creates a new ReservationManager.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationManager { pool }
    }

    // =========================================================================
    // Transaction-level operations
    // =========================================================================

    /// Locks every SKU of the batch in sorted order.
    ///
    /// Unknown SKUs are reported in the batch's caller order.
    pub(crate) async fn lock_batch(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        batch: &ReservationBatch,
    ) -> EngineResult<HashMap<String, InventoryItem>> {
        let mut locked = HashMap::new();
        for sku in batch.lock_order() {
            if let Some(item) = inventory::try_lock_item(tx, sku).await? {
                locked.insert(sku.to_string(), item);
            }
        }

        if let Some((missing, _)) = batch
            .requested()
            .into_iter()
            .find(|(sku, _)| !locked.contains_key(*sku))
        {
            return Err(CoreError::SkuNotFound(missing.to_string()).into());
        }

        Ok(locked)
    }

    /// Reserves every SKU of the batch, or nothing.
    pub async fn reserve(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        batch: &ReservationBatch,
    ) -> EngineResult<()> {
        let locked = Self::lock_batch(tx, batch).await?;

        for (sku, requested) in batch.requested() {
            let item = locked
                .get(sku)
                .ok_or_else(|| CoreError::SkuNotFound(sku.to_string()))?;
            check_reservable(sku, item.on_hand, item.reserved, requested)?;
        }

        for (sku, requested) in batch.requested() {
            inventory::apply_delta(tx, sku, 0, requested).await?;
            debug!(sku = %sku, requested, "Reserved stock");
        }

        Ok(())
    }

    /// Releases up to `quantity` of a SKU's reservation.
    ///
    /// ## Returns
    /// The row after the release; never drives `reserved` negative.
    pub async fn release(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        sku: &str,
        quantity: i64,
    ) -> EngineResult<InventoryItem> {
        let item = inventory::lock_item(tx, sku).await?;
        let amount = release_amount(item.reserved, quantity);
        if amount == 0 {
            return Ok(item);
        }

        let item = inventory::apply_delta(tx, sku, 0, -amount).await?;
        debug!(sku = %sku, released = amount, "Released reservation");
        Ok(item)
    }

    /// Releases every SKU of the batch.
    pub async fn release_batch(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        batch: &ReservationBatch,
    ) -> EngineResult<()> {
        for sku in batch.lock_order() {
            Self::release(tx, sku, batch.total_for(sku)).await?;
        }
        Ok(())
    }

    /// Physically removes stock and writes the outbound movement.
    ///
    /// `reservation_cap` is how much of this pick had been reserved for it;
    /// zero for picks unrelated to a reservation. Irreversible once
    /// committed.
    pub async fn commit_pick(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        actor: &str,
        sku: &str,
        quantity: i64,
        reservation_cap: i64,
        order_id: Option<i64>,
    ) -> EngineResult<InventoryItem> {
        let item = inventory::lock_item(tx, sku).await?;
        let effect = plan_pick(sku, item.on_hand, item.reserved, quantity, reservation_cap)?;

        let item =
            inventory::apply_delta(tx, sku, -effect.on_hand_delta, -effect.reserved_delta).await?;
        inventory::insert_movement(tx, sku, MovementType::Outbound, quantity, order_id, actor)
            .await?;

        debug!(
            sku = %sku,
            quantity,
            unreserved = effect.reserved_delta,
            order_id = ?order_id,
            "Committed pick"
        );
        Ok(item)
    }

    /// Picks every SKU of the batch against its own reservation, or nothing.
    ///
    /// All rows are locked and checked before the first write so the
    /// reported failure is the first offending line in caller order.
    pub async fn commit_pick_batch(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        actor: &str,
        batch: &ReservationBatch,
        order_id: i64,
    ) -> EngineResult<()> {
        let locked = Self::lock_batch(tx, batch).await?;

        for (sku, quantity) in batch.requested() {
            let item = locked
                .get(sku)
                .ok_or_else(|| CoreError::SkuNotFound(sku.to_string()))?;
            plan_pick(sku, item.on_hand, item.reserved, quantity, quantity)?;
        }

        for sku in batch.lock_order() {
            let quantity = batch.total_for(sku);
            Self::commit_pick(tx, actor, sku, quantity, quantity, Some(order_id)).await?;
        }

        Ok(())
    }

    /// Adds received stock and writes the inbound movement.
    pub async fn receive(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        actor: &str,
        sku: &str,
        quantity: i64,
    ) -> EngineResult<InventoryItem> {
        inventory::lock_item(tx, sku).await?;
        let item = inventory::apply_delta(tx, sku, quantity, 0).await?;
        inventory::insert_movement(tx, sku, MovementType::Inbound, quantity, None, actor).await?;
        Ok(item)
    }

    /// Sets on-hand to a counted quantity.
    ///
    /// ## Returns
    /// The row after the correction and the signed difference applied. A
    /// zero difference writes no movement.
    pub async fn adjust(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        actor: &str,
        sku: &str,
        counted: i64,
    ) -> EngineResult<(InventoryItem, i64)> {
        let item = inventory::lock_item(tx, sku).await?;
        let delta = plan_adjustment(item.on_hand, item.reserved, counted)?;
        if delta == 0 {
            return Ok((item, 0));
        }

        let item = inventory::apply_delta(tx, sku, delta, 0).await?;
        inventory::insert_movement(tx, sku, MovementType::Adjustment, delta, None, actor).await?;
        Ok((item, delta))
    }

    // =========================================================================
    // Standalone operations
    // =========================================================================

    /// Registers a new SKU, optionally with opening stock.
    pub async fn register_item(
        &self,
        actor: &str,
        item: NewInventoryItem,
    ) -> EngineResult<InventoryItem> {
        validate_actor(actor)?;
        validate_sku(&item.sku)?;
        validate_product_name(&item.product_name)?;
        validate_counted_quantity(item.on_hand)?;

        let mut tx = self.pool.begin().await?;

        let created = match inventory::insert_item(&mut tx, &item).await {
            Ok(created) => created,
            Err(DbError::UniqueViolation { .. }) => {
                return Err(CoreError::DuplicateSku(item.sku.trim().to_string()).into())
            }
            Err(err) => return Err(err.into()),
        };

        if created.on_hand > 0 {
            inventory::insert_movement(
                &mut tx,
                &created.sku,
                MovementType::Inbound,
                created.on_hand,
                None,
                actor,
            )
            .await?;
        }

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, AuditAction::InventoryCreated, AuditEntity::Inventory)
                .entity_id(&created.sku)
                .detail(json!({
                    "product_name": created.product_name,
                    "on_hand": created.on_hand,
                })),
        )
        .await?;

        tx.commit().await?;

        info!(sku = %created.sku, on_hand = created.on_hand, "Inventory item registered");
        Ok(created)
    }

    /// Receives stock at the dock (outside the scanner flow).
    pub async fn receive_stock(
        &self,
        actor: &str,
        sku: &str,
        quantity: i64,
    ) -> EngineResult<InventoryItem> {
        validate_actor(actor)?;
        validate_sku(sku)?;
        validate_quantity(quantity)?;
        let sku = sku.trim();

        let mut tx = self.pool.begin().await?;

        let item = Self::receive(&mut tx, actor, sku, quantity).await?;

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, AuditAction::StockReceived, AuditEntity::Inventory)
                .entity_id(sku)
                .detail(json!({ "quantity": quantity, "on_hand": item.on_hand })),
        )
        .await?;

        tx.commit().await?;

        info!(sku = %sku, quantity, on_hand = item.on_hand, "Stock received");
        Ok(item)
    }

    /// Applies a cycle-count result.
    pub async fn adjust_stock(
        &self,
        actor: &str,
        sku: &str,
        counted: i64,
        reason: Option<&str>,
    ) -> EngineResult<InventoryItem> {
        validate_actor(actor)?;
        validate_sku(sku)?;
        validate_counted_quantity(counted)?;
        let reason = validate_note("reason", reason)?;
        let sku = sku.trim();

        let mut tx = self.pool.begin().await?;

        let before = inventory::lock_item(&mut tx, sku).await?;
        let (item, delta) = Self::adjust(&mut tx, actor, sku, counted).await?;

        let mut record = AuditRecord::new(actor, AuditAction::StockAdjusted, AuditEntity::Inventory)
            .entity_id(sku)
            .detail(json!({
                "previous_on_hand": before.on_hand,
                "counted": counted,
                "delta": delta,
            }));
        if let Some(reason) = reason {
            record = record.reason(reason);
        }
        AuditRecorder::record(&mut tx, &record).await?;

        tx.commit().await?;

        info!(sku = %sku, counted, delta, "Stock adjusted");
        Ok(item)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, ErrorKind};
    use stockyard_core::{LineRequest, Page};

    async fn setup(items: &[(&str, i64)]) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (sku, on_hand) in items {
            db.reservations()
                .register_item(
                    "tester",
                    NewInventoryItem {
                        sku: sku.to_string(),
                        product_name: format!("Item {sku}"),
                        on_hand: *on_hand,
                    },
                )
                .await
                .unwrap();
        }
        db
    }

    async fn stock(db: &Database, sku: &str) -> (i64, i64) {
        let item = db.inventory().get_by_sku(sku).await.unwrap().unwrap();
        (item.on_hand, item.reserved)
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing() {
        let db = setup(&[("A", 100), ("B", 5)]).await;

        let batch = ReservationBatch::from_lines(&[LineRequest::new("A", 10), LineRequest::new("B", 10)]);
        let mut tx = db.pool().begin().await.unwrap();
        let err = ReservationManager::reserve(&mut tx, &batch).await.unwrap_err();
        drop(tx);

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(stock(&db, "A").await, (100, 0));
        assert_eq!(stock(&db, "B").await, (5, 0));
    }

    #[tokio::test]
    async fn test_reserve_sums_duplicate_lines() {
        let db = setup(&[("A", 10)]).await;

        // 6 + 6 > 10 even though each line fits alone
        let batch = ReservationBatch::from_lines(&[LineRequest::new("A", 6), LineRequest::new("A", 6)]);
        let mut tx = db.pool().begin().await.unwrap();
        assert!(ReservationManager::reserve(&mut tx, &batch).await.is_err());
        drop(tx);

        let batch = ReservationBatch::from_lines(&[LineRequest::new("A", 4), LineRequest::new("A", 6)]);
        let mut tx = db.pool().begin().await.unwrap();
        ReservationManager::reserve(&mut tx, &batch).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(stock(&db, "A").await, (10, 10));
    }

    #[tokio::test]
    async fn test_reserve_reports_first_unknown_sku_in_caller_order() {
        let db = setup(&[("A", 10)]).await;

        let batch = ReservationBatch::from_lines(&[
            LineRequest::new("ZZ", 1),
            LineRequest::new("A", 1),
            LineRequest::new("BB", 1),
        ]);
        let mut tx = db.pool().begin().await.unwrap();
        let err = ReservationManager::reserve(&mut tx, &batch).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::SkuNotFound(sku)) if sku == "ZZ"));
    }

    #[tokio::test]
    async fn test_release_never_negative() {
        let db = setup(&[("A", 10)]).await;

        let mut tx = db.pool().begin().await.unwrap();
        ReservationManager::reserve(&mut tx, &ReservationBatch::from_lines(&[LineRequest::new("A", 3)]))
            .await
            .unwrap();
        let item = ReservationManager::release(&mut tx, "A", 8).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!((item.on_hand, item.reserved), (10, 0));
    }

    #[tokio::test]
    async fn test_unlinked_pick_cannot_take_reserved_stock() {
        let db = setup(&[("A", 10)]).await;

        let mut tx = db.pool().begin().await.unwrap();
        ReservationManager::reserve(&mut tx, &ReservationBatch::from_lines(&[LineRequest::new("A", 8)]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = ReservationManager::commit_pick(&mut tx, "op", "A", 3, 0, None)
            .await
            .unwrap_err();
        drop(tx);
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let mut tx = db.pool().begin().await.unwrap();
        ReservationManager::commit_pick(&mut tx, "op", "A", 2, 0, None)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(stock(&db, "A").await, (8, 8));
    }

    #[tokio::test]
    async fn test_receive_stock_writes_movement_and_audit() {
        let db = setup(&[("A", 0)]).await;

        let item = db.reservations().receive_stock("dock", "A", 25).await.unwrap();
        assert_eq!(item.on_hand, 25);

        let movements = db.inventory().movements("A", Page::default()).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Inbound);

        let audit = db
            .audit()
            .list(Some(AuditEntity::Inventory), Some("A"), Page::default())
            .await
            .unwrap();
        assert_eq!(audit[0].action, AuditAction::StockReceived);

        let err = db.reservations().receive_stock("dock", "NOPE", 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let db = setup(&[("A", 10)]).await;

        let item = db
            .reservations()
            .adjust_stock("auditor", "A", 7, Some("damaged"))
            .await
            .unwrap();
        assert_eq!(item.on_hand, 7);

        let movements = db.inventory().movements("A", Page::default()).await.unwrap();
        assert_eq!(movements[0].movement_type, MovementType::Adjustment);
        assert_eq!(movements[0].quantity, -3);

        // No change, no movement.
        db.reservations().adjust_stock("auditor", "A", 7, None).await.unwrap();
        let movements = db.inventory().movements("A", Page::default()).await.unwrap();
        assert_eq!(movements.len(), 2); // opening balance + adjustment
    }

    #[tokio::test]
    async fn test_adjust_below_reserved_rejected() {
        let db = setup(&[("A", 10)]).await;

        let mut tx = db.pool().begin().await.unwrap();
        ReservationManager::reserve(&mut tx, &ReservationBatch::from_lines(&[LineRequest::new("A", 6)]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = db.reservations().adjust_stock("auditor", "A", 5, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(stock(&db, "A").await, (10, 6));
    }

    #[tokio::test]
    async fn test_register_duplicate_sku() {
        let db = setup(&[("A", 1)]).await;

        let err = db
            .reservations()
            .register_item(
                "tester",
                NewInventoryItem {
                    sku: "A".to_string(),
                    product_name: "Again".to_string(),
                    on_hand: 0,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
