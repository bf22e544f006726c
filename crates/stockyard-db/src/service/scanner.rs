//! # Scanner Service
//!
//! Confirmations from the handheld scanner.
//!
//! ## Confirmation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  scan(sku, qty, action, order_id?)                                     │
//! │       │                                                                 │
//! │       ├── pick + order ─► lock order (pending or picked only)          │
//! │       │                   sku must be on one of its lines              │
//! │       │                   cap = line qty for sku - already picked      │
//! │       │                   commit_pick(qty, cap)                        │
//! │       │                   pending → picked                             │
//! │       │                                                                 │
//! │       ├── pick ─────────► commit_pick(qty, 0)  (unreserved stock only) │
//! │       │                                                                 │
//! │       └── receive ──────► receive(qty)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  complete oldest open task for sku (best effort)                       │
//! │  audit scanner_pick / scanner_receive                                  │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::repository::audit::AuditRecorder;
use crate::repository::inventory::{self, InventoryLedger};
use crate::repository::order as order_repo;
use crate::repository::task::{self, TaskDispatcher};
use crate::service::reservation::ReservationManager;
use stockyard_core::lifecycle::plan_scan_pick;
use stockyard_core::validation::{validate_actor, validate_quantity, validate_sku};
use stockyard_core::{
    AuditAction, AuditEntity, AuditRecord, CoreError, InventoryItem, OrderStatus, ScanAction,
    ScanConfirmation, ScanLookup, ValidationError,
};

/// Handheld scanner operations.
#[derive(Debug, Clone)]
pub struct ScanService {
    pool: SqlitePool,
}

impl ScanService {
    /// Creates a new ScanService.
    pub fn new(pool: SqlitePool) -> Self {
        ScanService { pool }
    }

    /// Applies a scanner confirmation.
    ///
    /// ## Errors
    /// - `Validation` - bad quantity or SKU, an order on a receive scan, or
    ///   a linked pick for a SKU the order does not contain
    /// - `SkuNotFound` / `OrderNotFound`
    /// - `IllegalTransition` - pick against a packed, shipped or cancelled order
    /// - `InsufficientStock`
    pub async fn record_scan_event(
        &self,
        actor: &str,
        sku: &str,
        quantity: i64,
        action: ScanAction,
        order_id: Option<i64>,
    ) -> EngineResult<ScanConfirmation> {
        validate_actor(actor)?;
        validate_sku(sku)?;
        validate_quantity(quantity)?;
        let sku = sku.trim();

        let mut tx = self.pool.begin().await?;

        let item = match action {
            ScanAction::Pick => Self::pick(&mut tx, actor, sku, quantity, order_id).await?,
            ScanAction::Receive => {
                if order_id.is_some() {
                    return Err(ValidationError::InvalidFormat {
                        field: "order_id".to_string(),
                        reason: "only pick scans reference an order".to_string(),
                    }
                    .into());
                }
                ReservationManager::receive(&mut tx, actor, sku, quantity).await?
            }
        };

        let completed = task::complete_matching_task(&mut tx, sku).await?;
        let completed_task_id = completed.map(|t| t.id);

        let confirmation_id = Uuid::new_v4().to_string();
        let (audit_action, verb) = match action {
            ScanAction::Pick => (AuditAction::ScannerPick, "PICK"),
            ScanAction::Receive => (AuditAction::ScannerReceive, "RECEIVE"),
        };

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, audit_action, AuditEntity::Scanner)
                .entity_id(sku)
                .detail(json!({
                    "confirmation_id": confirmation_id,
                    "sku": sku,
                    "quantity": quantity,
                    "order_id": order_id,
                    "completed_task_id": completed_task_id,
                }))
                .reason(format!(
                    "{verb} {quantity}x {sku}{}",
                    if completed_task_id.is_some() { " (Task Updated)" } else { "" }
                )),
        )
        .await?;

        tx.commit().await?;

        info!(
            sku = %sku,
            quantity,
            action = action.as_str(),
            order_id = ?order_id,
            completed_task_id = ?completed_task_id,
            "Scan confirmed"
        );

        Ok(ScanConfirmation {
            message: format!(
                "Scanner action {} confirmed for {}. Stock updated.{}",
                action.as_str(),
                sku,
                if completed_task_id.is_some() {
                    " Associated task marked COMPLETE."
                } else {
                    ""
                }
            ),
            confirmation_id,
            sku: sku.to_string(),
            action,
            quantity,
            order_id,
            on_hand: item.on_hand,
            reserved: item.reserved,
            completed_task_id,
        })
    }

    async fn pick(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        actor: &str,
        sku: &str,
        quantity: i64,
        order_id: Option<i64>,
    ) -> EngineResult<InventoryItem> {
        let Some(order_id) = order_id else {
            return ReservationManager::commit_pick(tx, actor, sku, quantity, 0, None).await;
        };

        let order = order_repo::lock_order(tx, order_id).await?;
        let next = plan_scan_pick(order_id, order.status)?;

        let ordered: i64 = order_repo::lines_in_tx(tx, order_id)
            .await?
            .iter()
            .filter(|line| line.sku == sku)
            .map(|line| line.quantity)
            .sum();
        if ordered == 0 {
            return Err(ValidationError::InvalidFormat {
                field: "sku".to_string(),
                reason: format!("{sku} is not on order {}", order.order_number),
            }
            .into());
        }
        let already_picked = inventory::picked_for_order(tx, order_id, sku).await?;
        let cap = (ordered - already_picked).max(0);

        let item =
            ReservationManager::commit_pick(tx, actor, sku, quantity, cap, Some(order_id)).await?;

        if let Some(status) = next {
            order_repo::set_status(tx, order_id, status).await?;
            AuditRecorder::record(
                tx,
                &AuditRecord::new(actor, AuditAction::OrderStatusChanged, AuditEntity::Order)
                    .entity_id(order_id)
                    .detail(json!({
                        "order_number": order.order_number,
                        "from": OrderStatus::Pending,
                        "to": status,
                        "via": "scanner",
                    })),
            )
            .await?;
        }

        Ok(item)
    }

    /// What the scanner shows for a barcode: the stock record and the open
    /// tasks referencing it.
    pub async fn lookup(&self, sku: &str) -> EngineResult<ScanLookup> {
        let sku = sku.trim();

        let item = InventoryLedger::new(self.pool.clone())
            .get_by_sku(sku)
            .await?
            .ok_or_else(|| CoreError::SkuNotFound(sku.to_string()))?;

        let pending_tasks = TaskDispatcher::new(self.pool.clone())
            .open_for_sku(sku)
            .await?;

        Ok(ScanLookup {
            item,
            pending_tasks,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, ErrorKind};
    use stockyard_core::{LineRequest, NewInventoryItem, Page, TaskPayload, TaskStatus};

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
    async fn test_linked_pick_moves_order_to_picked() {
        let db = setup(&[("A", 20)]).await;
        let detail = db
            .order_machine()
            .create_order("clerk", "SO-1", &[LineRequest::new("A", 5)])
            .await
            .unwrap();

        let confirmation = db
            .scanner()
            .record_scan_event("picker", "A", 5, ScanAction::Pick, Some(detail.order.id))
            .await
            .unwrap();

        assert_eq!((confirmation.on_hand, confirmation.reserved), (15, 0));
        assert!(confirmation.message.contains("Associated task marked COMPLETE"));
        let order = db.orders().get_by_id(detail.order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Picked);

        let tasks = db.tasks().for_order(detail.order.id).await.unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_repeat_scans_only_unreserve_the_line() {
        let db = setup(&[("A", 20)]).await;
        let machine = db.order_machine();
        let first = machine
            .create_order("clerk", "SO-1", &[LineRequest::new("A", 5)])
            .await
            .unwrap();
        machine
            .create_order("clerk", "SO-2", &[LineRequest::new("A", 5)])
            .await
            .unwrap();
        assert_eq!(stock(&db, "A").await, (20, 10));

        let scanner = db.scanner();
        scanner
            .record_scan_event("picker", "A", 3, ScanAction::Pick, Some(first.order.id))
            .await
            .unwrap();
        scanner
            .record_scan_event("picker", "A", 2, ScanAction::Pick, Some(first.order.id))
            .await
            .unwrap();
        assert_eq!(stock(&db, "A").await, (15, 5));

        // Over-pick: the line is exhausted, so the extra unit must come from
        // unreserved stock and leaves SO-2's reservation alone.
        scanner
            .record_scan_event("picker", "A", 1, ScanAction::Pick, Some(first.order.id))
            .await
            .unwrap();
        assert_eq!(stock(&db, "A").await, (14, 5));
    }

    #[tokio::test]
    async fn test_pick_against_packed_order_rejected() {
        let db = setup(&[("A", 20)]).await;
        let detail = db
            .order_machine()
            .create_order("clerk", "SO-1", &[LineRequest::new("A", 5)])
            .await
            .unwrap();
        db.scanner()
            .record_scan_event("picker", "A", 5, ScanAction::Pick, Some(detail.order.id))
            .await
            .unwrap();
        db.order_machine()
            .transition_order_status("clerk", detail.order.id, OrderStatus::Packed)
            .await
            .unwrap();

        let err = db
            .scanner()
            .record_scan_event("picker", "A", 1, ScanAction::Pick, Some(detail.order.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalStateTransition);
        assert_eq!(stock(&db, "A").await, (15, 0));
    }

    #[tokio::test]
    async fn test_unlinked_pick_and_unknown_order() {
        let db = setup(&[("A", 4)]).await;

        let confirmation = db
            .scanner()
            .record_scan_event("picker", "A", 4, ScanAction::Pick, None)
            .await
            .unwrap();
        assert_eq!(confirmation.on_hand, 0);
        assert!(confirmation.completed_task_id.is_none());

        let err = db
            .scanner()
            .record_scan_event("picker", "A", 1, ScanAction::Pick, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let err = db
            .scanner()
            .record_scan_event("picker", "A", 1, ScanAction::Pick, Some(404))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_receive_completes_put_away_task() {
        let db = setup(&[("A", 0)]).await;
        let task = db
            .tasks()
            .create_task("lead", TaskPayload::PutAway { sku: "A".to_string(), quantity: 12 }, None)
            .await
            .unwrap();

        let confirmation = db
            .scanner()
            .record_scan_event("dock", "A", 12, ScanAction::Receive, None)
            .await
            .unwrap();
        assert_eq!(confirmation.on_hand, 12);
        assert_eq!(confirmation.completed_task_id, Some(task.id));

        let audit = db
            .audit()
            .list(Some(AuditEntity::Scanner), Some("A"), Page::default())
            .await
            .unwrap();
        assert_eq!(audit[0].action, AuditAction::ScannerReceive);
        assert_eq!(audit[0].reason.as_deref(), Some("RECEIVE 12x A (Task Updated)"));
    }

    #[tokio::test]
    async fn test_receive_rejects_order_and_unknown_sku() {
        let db = setup(&[("A", 0)]).await;

        let err = db
            .scanner()
            .record_scan_event("dock", "A", 1, ScanAction::Receive, Some(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db
            .scanner()
            .record_scan_event("dock", "NOPE", 1, ScanAction::Receive, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = db
            .scanner()
            .record_scan_event("dock", "A", 0, ScanAction::Receive, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_lookup() {
        let db = setup(&[("A", 9)]).await;
        db.order_machine()
            .create_order("clerk", "SO-1", &[LineRequest::new("A", 2)])
            .await
            .unwrap();

        let lookup = db.scanner().lookup("A").await.unwrap();
        assert_eq!(lookup.item.available(), 7);
        assert_eq!(lookup.pending_tasks.len(), 1);

        let err = db.scanner().lookup("NOPE").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_linked_pick_for_sku_off_the_order_rejected() {
        let db = setup(&[("A", 10), ("B", 10)]).await;
        let detail = db
            .order_machine()
            .create_order("clerk", "SO-1", &[LineRequest::new("A", 4)])
            .await
            .unwrap();

        let err = db
            .scanner()
            .record_scan_event("picker", "B", 2, ScanAction::Pick, Some(detail.order.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let order = db.orders().get_by_id(detail.order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(stock(&db, "A").await, (10, 4));
        assert_eq!(stock(&db, "B").await, (10, 0));
        let tasks = db.tasks().for_order(detail.order.id).await.unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Pending);
    }
}
