//! # Task Dispatcher
//!
//! Creates, assigns, completes and cancels warehouse-floor work.
//!
//! ## Task Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_pick_task ─┐                                                  │
//! │   create_task ──────┴──► pending ──assign──► in_progress               │
//! │                            │  │                  │                      │
//! │     order shipped/         │  └──── scan ────────┴──► completed        │
//! │     cancelled/deleted ─────┘                     ▲                      │
//! │            │             update_task_status ─────┘ (in_progress only)  │
//! │            ▼                                                            │
//! │        cancelled                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scan Matching
//! A scan completes the oldest open task whose SKU matches, whatever its
//! type and whichever order it belongs to. This is a heuristic, not a
//! binding between a scan and a specific task.

use chrono::Utc;
use serde_json::json;
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbResult, EngineResult};
use crate::repository::audit::AuditRecorder;
use crate::repository::inventory;
use stockyard_core::lifecycle::check_task_status;
use stockyard_core::validation::{validate_actor, validate_note, validate_quantity, validate_sku};
use stockyard_core::{
    AuditAction, AuditEntity, AuditRecord, CoreError, Order, OrderLine, Page, Task, TaskPayload,
    TaskStatus, ValidationError,
};

/// Task creation, assignment and listing.
#[derive(Debug, Clone)]
pub struct TaskDispatcher {
    pool: SqlitePool,
}

impl TaskDispatcher {
    /// Creates a new TaskDispatcher.
    pub fn new(pool: SqlitePool) -> Self {
        TaskDispatcher { pool }
    }

    /// Creates a manual put-away or cycle-count task.
    ///
    /// Pick tasks only come from order creation.
    pub async fn create_task(
        &self,
        actor: &str,
        payload: TaskPayload,
        notes: Option<&str>,
    ) -> EngineResult<Task> {
        validate_actor(actor)?;
        validate_sku(payload.sku())?;
        let notes = validate_note("notes", notes)?;

        match &payload {
            TaskPayload::Pick { .. } => {
                return Err(ValidationError::NotAllowed {
                    field: "kind".to_string(),
                    allowed: vec!["put_away".to_string(), "cycle_count".to_string()],
                }
                .into());
            }
            TaskPayload::PutAway { quantity, .. } => validate_quantity(*quantity)?,
            TaskPayload::CycleCount { .. } => {}
        }

        let mut tx = self.pool.begin().await?;

        // Validates the SKU and serializes with stock writers.
        inventory::lock_item(&mut tx, payload.sku()).await?;

        let task = insert_task(&mut tx, &payload, notes.as_deref()).await?;

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, AuditAction::TaskCreated, AuditEntity::Task)
                .entity_id(task.id)
                .detail(json!({ "payload": payload, "notes": notes })),
        )
        .await?;

        tx.commit().await?;

        info!(task_id = task.id, task_type = ?task.task_type, sku = %payload.sku(), "Task created");
        Ok(task)
    }

    /// Assigns a task to an operator.
    ///
    /// A pending task moves to `in_progress`; an in-progress task is
    /// reassigned. Completed and cancelled tasks are closed.
    pub async fn assign_task(&self, actor: &str, task_id: i64, assignee: &str) -> EngineResult<Task> {
        validate_actor(actor)?;
        if assignee.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "assignee".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let task = lock_task(&mut tx, task_id).await?;
        if !task.status.is_open() {
            return Err(CoreError::TaskClosed {
                task_id,
                status: task.status.to_string(),
            }
            .into());
        }

        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = ?2, assigned_to = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING id, task_type, status, payload, assigned_to, notes, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(TaskStatus::InProgress)
        .bind(assignee.trim())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, AuditAction::TaskAssigned, AuditEntity::Task)
                .entity_id(task_id)
                .detail(json!({ "assigned_to": task.assigned_to })),
        )
        .await?;

        tx.commit().await?;

        info!(task_id, assignee = %assignee.trim(), "Task assigned");
        Ok(task)
    }

    /// Closes a task by hand.
    ///
    /// Finishes or abandons an in-progress task, or abandons a pending one.
    /// This is how operators clear work left on a cancelled or shipped
    /// order without a scan, which would move stock. `notes` replaces the
    /// existing note when given.
    ///
    /// ## Errors
    /// - `TaskNotFound`
    /// - `TaskClosed` - already completed or cancelled
    /// - `Validation` - any other target status
    pub async fn update_task_status(
        &self,
        actor: &str,
        task_id: i64,
        status: TaskStatus,
        notes: Option<&str>,
    ) -> EngineResult<Task> {
        validate_actor(actor)?;
        let notes = validate_note("notes", notes)?;

        let mut tx = self.pool.begin().await?;

        let current = lock_task(&mut tx, task_id).await?;
        check_task_status(task_id, current.status, status)?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = ?2, notes = COALESCE(?3, notes), updated_at = ?4
            WHERE id = ?1
            RETURNING id, task_type, status, payload, assigned_to, notes, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(status)
        .bind(notes.as_deref())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        AuditRecorder::record(
            &mut tx,
            &AuditRecord::new(actor, AuditAction::TaskStatusChanged, AuditEntity::Task)
                .entity_id(task_id)
                .detail(json!({
                    "from": current.status,
                    "to": status,
                    "notes": task.notes,
                })),
        )
        .await?;

        tx.commit().await?;

        info!(task_id, from = %current.status, to = %status, "Task status changed");
        Ok(task)
    }

    /// Gets a task by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, status, payload, assigned_to, notes, created_at, updated_at
            FROM tasks
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks oldest first, optionally filtered by status.
    pub async fn list(&self, status: Option<TaskStatus>, page: Page) -> DbResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, status, payload, assigned_to, notes, created_at, updated_at
            FROM tasks
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY id
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Open tasks referencing a SKU, oldest first.
    pub async fn open_for_sku(&self, sku: &str) -> DbResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, status, payload, assigned_to, notes, created_at, updated_at
            FROM tasks
            WHERE sku = ?1 AND status IN ('pending', 'in_progress')
            ORDER BY id
            "#,
        )
        .bind(sku.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Tasks correlated to an order.
    pub async fn for_order(&self, order_id: i64) -> DbResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, status, payload, assigned_to, notes, created_at, updated_at
            FROM tasks
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn lock_task(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, task_id: i64) -> EngineResult<Task> {
    let touched = sqlx::query("UPDATE tasks SET updated_at = updated_at WHERE id = ?1")
        .bind(task_id)
        .execute(&mut **tx)
        .await?;

    if touched.rows_affected() == 0 {
        return Err(CoreError::TaskNotFound(task_id).into());
    }

    let task = sqlx::query_as::<_, Task>(
        r#"
        SELECT id, task_type, status, payload, assigned_to, notes, created_at, updated_at
        FROM tasks
        WHERE id = ?1
        "#,
    )
    .bind(task_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(task)
}

/// Inserts a pending task. `sku` and `order_id` are copied out of the
/// payload into their own columns.
pub(crate) async fn insert_task(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    payload: &TaskPayload,
    notes: Option<&str>,
) -> DbResult<Task> {
    let now = Utc::now();

    let task = sqlx::query_as::<_, Task>(
        r#"
        INSERT INTO tasks (task_type, status, payload, sku, order_id, notes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
        RETURNING id, task_type, status, payload, assigned_to, notes, created_at, updated_at
        "#,
    )
    .bind(payload.task_type())
    .bind(TaskStatus::Pending)
    .bind(Json(payload))
    .bind(payload.sku())
    .bind(payload.order_id())
    .bind(notes)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    Ok(task)
}

/// Emits the pick task for one order line.
pub(crate) async fn create_pick_task(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order: &Order,
    line: &OrderLine,
) -> DbResult<Task> {
    let payload = TaskPayload::Pick {
        order_id: order.id,
        order_number: order.order_number.clone(),
        sku: line.sku.clone(),
        quantity: line.quantity,
    };

    insert_task(tx, &payload, None).await
}

/// Cancels every still-pending task of an order.
///
/// In-progress tasks are left alone; an operator is already on them.
pub(crate) async fn cancel_pending_for_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> DbResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET status = 'cancelled', updated_at = ?2
        WHERE order_id = ?1 AND status = 'pending'
        "#,
    )
    .bind(order_id)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    debug!(order_id, cancelled = result.rows_affected(), "Cancelled pending tasks");
    Ok(result.rows_affected())
}

/// Completes the oldest open task referencing a SKU, if any.
pub(crate) async fn complete_matching_task(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku: &str,
) -> DbResult<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks
        SET status = 'completed', updated_at = ?2
        WHERE id = (
            SELECT id FROM tasks
            WHERE sku = ?1 AND status IN ('pending', 'in_progress')
            ORDER BY id
            LIMIT 1
        )
        RETURNING id, task_type, status, payload, assigned_to, notes, created_at, updated_at
        "#,
    )
    .bind(sku)
    .bind(Utc::now())
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(task) = &task {
        debug!(task_id = task.id, sku = %sku, "Scan completed task");
    }

    Ok(task)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stockyard_core::{LineRequest, NewInventoryItem, OrderStatus, ScanAction, TaskType};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.reservations()
            .register_item(
                "tester",
                NewInventoryItem {
                    sku: "BOLT-M8".to_string(),
                    product_name: "M8 bolt".to_string(),
                    on_hand: 10,
                },
            )
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_manual_task() {
        let db = setup().await;
        let task = db
            .tasks()
            .create_task(
                "lead",
                TaskPayload::CycleCount {
                    sku: "BOLT-M8".to_string(),
                },
                Some("aisle 4"),
            )
            .await
            .unwrap();

        assert_eq!(task.task_type, TaskType::CycleCount);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.notes.as_deref(), Some("aisle 4"));

        let open = db.tasks().open_for_sku("BOLT-M8").await.unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn test_create_task_rejects_pick_and_unknown_sku() {
        let db = setup().await;
        let err = db
            .tasks()
            .create_task(
                "lead",
                TaskPayload::Pick {
                    order_id: 1,
                    order_number: "SO-1".to_string(),
                    sku: "BOLT-M8".to_string(),
                    quantity: 1,
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);

        let err = db
            .tasks()
            .create_task(
                "lead",
                TaskPayload::PutAway {
                    sku: "NOPE".to_string(),
                    quantity: 3,
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_assign_task() {
        let db = setup().await;
        let task = db
            .tasks()
            .create_task(
                "lead",
                TaskPayload::PutAway {
                    sku: "BOLT-M8".to_string(),
                    quantity: 4,
                },
                None,
            )
            .await
            .unwrap();

        let assigned = db.tasks().assign_task("lead", task.id, "op-1").await.unwrap();
        assert_eq!(assigned.status, TaskStatus::InProgress);
        assert_eq!(assigned.assigned_to.as_deref(), Some("op-1"));

        let err = db.tasks().assign_task("lead", 999, "op-1").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_complete_matching_task_picks_oldest() {
        let db = setup().await;
        let first = db
            .tasks()
            .create_task("lead", TaskPayload::CycleCount { sku: "BOLT-M8".to_string() }, None)
            .await
            .unwrap();
        let second = db
            .tasks()
            .create_task("lead", TaskPayload::CycleCount { sku: "BOLT-M8".to_string() }, None)
            .await
            .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let done = complete_matching_task(&mut tx, "BOLT-M8").await.unwrap().unwrap();
        assert_eq!(done.id, first.id);
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(complete_matching_task(&mut tx, "OTHER").await.unwrap().is_none());
        tx.commit().await.unwrap();

        // Closed tasks cannot be assigned.
        let err = db.tasks().assign_task("lead", first.id, "op").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::IllegalStateTransition);

        let open = db.tasks().open_for_sku("BOLT-M8").await.unwrap();
        assert_eq!(open.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second.id]);
    }

    #[tokio::test]
    async fn test_update_task_status_rules() {
        let db = setup().await;
        let dispatcher = db.tasks();
        let count = |sku: &str| TaskPayload::CycleCount { sku: sku.to_string() };

        let pending = dispatcher.create_task("lead", count("BOLT-M8"), None).await.unwrap();
        let err = dispatcher
            .update_task_status("lead", pending.id, TaskStatus::Completed, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);

        let cancelled = dispatcher
            .update_task_status("lead", pending.id, TaskStatus::Cancelled, Some("miscounted"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);
        assert_eq!(cancelled.notes.as_deref(), Some("miscounted"));

        let err = dispatcher
            .update_task_status("lead", pending.id, TaskStatus::Completed, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::IllegalStateTransition);

        let running = dispatcher.create_task("lead", count("BOLT-M8"), Some("aisle 2")).await.unwrap();
        dispatcher.assign_task("lead", running.id, "op-1").await.unwrap();
        let done = dispatcher
            .update_task_status("op-1", running.id, TaskStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.notes.as_deref(), Some("aisle 2"));
        assert_eq!(done.assigned_to.as_deref(), Some("op-1"));

        let err = dispatcher
            .update_task_status("lead", 999, TaskStatus::Cancelled, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);

        let audit = db
            .audit()
            .list(Some(AuditEntity::Task), Some(&running.id.to_string()), Page::default())
            .await
            .unwrap();
        assert_eq!(audit[0].action, AuditAction::TaskStatusChanged);
        assert_eq!(audit[0].detail["from"], "in_progress");
        assert_eq!(audit[0].detail["to"], "completed");
    }

    #[tokio::test]
    async fn test_closing_orphaned_task_frees_scan_for_live_order() {
        let db = setup().await;
        let machine = db.order_machine();

        let first = machine
            .create_order("clerk", "SO-1", &[LineRequest::new("BOLT-M8", 5)])
            .await
            .unwrap();
        let orphan = db.tasks().for_order(first.order.id).await.unwrap().remove(0);
        db.tasks().assign_task("lead", orphan.id, "op-1").await.unwrap();
        machine
            .transition_order_status("clerk", first.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        // The assigned task outlives its order until someone closes it.
        let still_open = db.tasks().get_by_id(orphan.id).await.unwrap().unwrap();
        assert_eq!(still_open.status, TaskStatus::InProgress);
        db.tasks()
            .update_task_status("op-1", orphan.id, TaskStatus::Cancelled, Some("order cancelled"))
            .await
            .unwrap();

        let second = machine
            .create_order("clerk", "SO-2", &[LineRequest::new("BOLT-M8", 5)])
            .await
            .unwrap();
        let confirmation = db
            .scanner()
            .record_scan_event("picker", "BOLT-M8", 5, ScanAction::Pick, Some(second.order.id))
            .await
            .unwrap();

        let live = db.tasks().for_order(second.order.id).await.unwrap().remove(0);
        assert_eq!(confirmation.completed_task_id, Some(live.id));
        assert_eq!(live.status, TaskStatus::Completed);

        let orphan = db.tasks().get_by_id(orphan.id).await.unwrap().unwrap();
        assert_eq!(orphan.status, TaskStatus::Cancelled);
    }
}
