//! # Order State Machine
//!
//! Owns order status. Every create, transition and delete runs as one
//! transaction that composes the reservation manager, the task dispatcher
//! and the audit recorder.
//!
//! ## Transition Side Effects
//! ```text
//! ┌──────────────────────┬────────────────────────────┬─────────────────────┐
//! │ Transition           │ Stock                      │ Tasks / Audit       │
//! ├──────────────────────┼────────────────────────────┼─────────────────────┤
//! │ create               │ reserve all lines          │ 1 pick task / line  │
//! │ pending → shipped    │ pick all lines (on_hand -, │ cancel pending      │
//! │                      │ reserved -), outbound mvmt │                     │
//! │ picked/packed → ship │ -                          │ -                   │
//! │ picked → packed      │ -                          │ -                   │
//! │ pending → cancelled  │ release all lines          │ cancel pending      │
//! │ picked/packed → canc │ - (stock already gone)     │ cancel pending,     │
//! │                      │                            │ anomaly entry       │
//! │ delete               │ keyed off current status   │ cancel pending,     │
//! │                      │                            │ full-detail entry   │
//! └──────────────────────┴────────────────────────────┴─────────────────────┘
//!   every transition also writes `order_status_changed`
//! ```
//!
//! ## Lock Order
//! The order row is locked first (its UPDATE is the transaction's first
//! write), then inventory rows in SKU order.

use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::EngineResult;
use crate::repository::audit::AuditRecorder;
use crate::repository::{order as order_repo, task};
use crate::service::reservation::ReservationManager;
use stockyard_core::lifecycle::{plan_deletion, plan_transition, DeletionPlan, TransitionPlan};
use stockyard_core::reservation::ReservationBatch;
use stockyard_core::validation::{validate_actor, validate_order_lines, validate_order_number};
use stockyard_core::{
    AuditAction, AuditEntity, AuditRecord, LineRequest, Order, OrderDetail, OrderLine, OrderStatus,
};

const AFTER_PICK_WARNING: &str =
    "Physical inventory was already removed from the shelves; stock was not restored";

/// Order creation, status transitions and deletion.
///
/// ## Usage
/// ```rust,ignore
/// let machine = db.order_machine();
/// let detail = machine
///     .create_order("clerk-1", "SO-1001", &[LineRequest::new("BOLT-M8", 10)])
///     .await?;
/// machine
///     .transition_order_status("clerk-1", detail.order.id, OrderStatus::Shipped)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderStateMachine {
    pool: SqlitePool,
}

impl OrderStateMachine {
    /// Creates a new OrderStateMachine.
    pub fn new(pool: SqlitePool) -> Self {
        OrderStateMachine { pool }
    }

    /// Creates a pending order, reserving every line.
    ///
    /// ## Errors
    /// - `Validation` - malformed number or lines (first bad line reported)
    /// - `DuplicateOrderNumber` - the number is taken
    /// - `SkuNotFound` / `InsufficientStock` - first offending line
    ///
    /// On any error nothing is persisted.
    pub async fn create_order(
        &self,
        actor: &str,
        order_number: &str,
        lines: &[LineRequest],
    ) -> EngineResult<OrderDetail> {
        validate_actor(actor)?;
        validate_order_number(order_number)?;
        validate_order_lines(lines)?;

        let order_number = order_number.trim();
        let batch = ReservationBatch::from_lines(lines);

        let mut tx = self.pool.begin().await?;

        let order = order_repo::insert_order(&mut tx, order_number).await?;

        ReservationManager::reserve(&mut tx, &batch).await?;

        let mut created = Vec::with_capacity(lines.len());
        for line in lines {
            let line = order_repo::insert_line(&mut tx, order.id, line.sku.trim(), line.quantity).await?;
            task::create_pick_task(&mut tx, &order, &line).await?;
            created.push(line);
        }

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, AuditAction::OrderCreated, AuditEntity::Order)
                .entity_id(order.id)
                .detail(json!({
                    "order_number": order.order_number,
                    "lines": lines_detail(&created),
                })),
        )
        .await?;

        tx.commit().await?;

        info!(
            order_id = order.id,
            order_number = %order.order_number,
            lines = created.len(),
            "Order created"
        );

        Ok(OrderDetail {
            order,
            lines: created,
        })
    }

    /// Moves an order to a new status, applying the transition's stock
    /// effect.
    ///
    /// ## Errors
    /// - `OrderNotFound`
    /// - `IllegalTransition` - terminal, backward, same-state, or a manual
    ///   move to `picked`
    /// - `InsufficientStock` - shipping from pending with stock missing
    pub async fn transition_order_status(
        &self,
        actor: &str,
        order_id: i64,
        to: OrderStatus,
    ) -> EngineResult<Order> {
        validate_actor(actor)?;

        let mut tx = self.pool.begin().await?;

        let order = order_repo::lock_order(&mut tx, order_id).await?;
        let from = order.status;
        let plan = plan_transition(order_id, from, to)?;

        let lines = order_repo::lines_in_tx(&mut tx, order_id).await?;
        let batch = batch_of(&lines);

        match plan {
            TransitionPlan::ShipUnpicked => {
                ReservationManager::commit_pick_batch(&mut tx, actor, &batch, order_id).await?;
            }
            TransitionPlan::ShipPicked | TransitionPlan::Pack => {}
            TransitionPlan::CancelReleasing => {
                ReservationManager::release_batch(&mut tx, &batch).await?;
                AuditRecorder::record(
                    &mut tx,
                    &AuditRecord::new(actor, AuditAction::OrderCancelled, AuditEntity::Order)
                        .entity_id(order_id)
                        .detail(json!({
                            "order_number": order.order_number,
                            "released": lines_detail(&lines),
                        })),
                )
                .await?;
            }
            TransitionPlan::CancelAfterPick => {
                AuditRecorder::record(
                    &mut tx,
                    &AuditRecord::new(actor, AuditAction::OrderCancelledAfterPick, AuditEntity::Order)
                        .entity_id(order_id)
                        .detail(json!({
                            "order_number": order.order_number,
                            "status": from,
                            "items": lines_detail(&lines),
                            "warning": AFTER_PICK_WARNING,
                        }))
                        .reason(AFTER_PICK_WARNING),
                )
                .await?;
            }
        }

        let cancelled_tasks = if plan.cancels_tasks() {
            task::cancel_pending_for_order(&mut tx, order_id).await?
        } else {
            0
        };

        let updated = order_repo::set_status(&mut tx, order_id, to).await?;

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, AuditAction::OrderStatusChanged, AuditEntity::Order)
                .entity_id(order_id)
                .detail(json!({
                    "order_number": updated.order_number,
                    "from": from,
                    "to": to,
                    "cancelled_tasks": cancelled_tasks,
                })),
        )
        .await?;

        tx.commit().await?;

        info!(order_id, %from, %to, "Order status changed");
        Ok(updated)
    }

    /// Deletes an order.
    ///
    /// The stock effect depends on the current status: pending orders
    /// release their reservations, picked or packed orders are flagged as
    /// an anomaly, shipped and cancelled orders have no stock effect. The
    /// audit entry carries every line, since the lines are removed too.
    pub async fn delete_order(&self, actor: &str, order_id: i64) -> EngineResult<()> {
        validate_actor(actor)?;

        let mut tx = self.pool.begin().await?;

        let order = order_repo::lock_order(&mut tx, order_id).await?;
        let lines = order_repo::lines_in_tx(&mut tx, order_id).await?;

        let plan = plan_deletion(order.status);
        match plan {
            DeletionPlan::ReleaseReservations => {
                ReservationManager::release_batch(&mut tx, &batch_of(&lines)).await?;
            }
            DeletionPlan::AfterPickAnomaly => {
                AuditRecorder::record(
                    &mut tx,
                    &AuditRecord::new(actor, AuditAction::OrderDeletedAfterPick, AuditEntity::Order)
                        .entity_id(order_id)
                        .detail(json!({
                            "order_number": order.order_number,
                            "status": order.status,
                            "items": lines_detail(&lines),
                            "warning": AFTER_PICK_WARNING,
                        }))
                        .reason(AFTER_PICK_WARNING),
                )
                .await?;
            }
            DeletionPlan::NoStockEffect => {}
        }

        let cancelled_tasks = task::cancel_pending_for_order(&mut tx, order_id).await?;

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, AuditAction::OrderDeleted, AuditEntity::Order)
                .entity_id(order_id)
                .detail(json!({
                    "order_number": order.order_number,
                    "status": order.status,
                    "lines": lines_detail(&lines),
                    "reservations_released": plan == DeletionPlan::ReleaseReservations,
                    "cancelled_tasks": cancelled_tasks,
                })),
        )
        .await?;

        order_repo::delete_order(&mut tx, order_id).await?;

        tx.commit().await?;

        if plan == DeletionPlan::AfterPickAnomaly {
            warn!(order_id, status = %order.status, "Order deleted after pick");
        }
        info!(order_id, order_number = %order.order_number, "Order deleted");
        Ok(())
    }
}

fn batch_of(lines: &[OrderLine]) -> ReservationBatch {
    let mut batch = ReservationBatch::default();
    for line in lines {
        batch.add(&line.sku, line.quantity);
    }
    batch
}

fn lines_detail(lines: &[OrderLine]) -> Value {
    lines
        .iter()
        .map(|line| json!({ "sku": line.sku, "quantity": line.quantity }))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
