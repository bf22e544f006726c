//! # Audit Recorder
//!
//! Append-only trail of every state-changing operation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │    ... business writes ...                                             │
//! │    AuditRecorder::record(&mut tx, ..)   ← same transaction             │
//! │  COMMIT    → business change and its audit entry land together         │
//! │  ROLLBACK  → neither exists                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table rejects UPDATE and DELETE with triggers, so entries can only
//! be added.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::warn;

use crate::error::DbResult;
use stockyard_core::{AuditEntity, AuditEntry, AuditRecord, Page};

/// Writes and reads audit entries.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    pool: SqlitePool,
}

impl AuditRecorder {
    /// Creates a new AuditRecorder.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRecorder { pool }
    }

    /// Appends an entry inside the caller's transaction.
    pub async fn record(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        record: &AuditRecord,
    ) -> DbResult<i64> {
        if record.action.is_anomaly() {
            warn!(
                actor = %record.actor,
                action = ?record.action,
                entity_id = ?record.entity_id,
                reason = ?record.reason,
                "Recording inventory anomaly"
            );
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audit_log (actor, action, entity_type, entity_id, detail, reason, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id
            "#,
        )
        .bind(&record.actor)
        .bind(record.action)
        .bind(record.entity_type)
        .bind(&record.entity_id)
        .bind(Json(&record.detail))
        .bind(&record.reason)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    /// Lists entries newest first, optionally narrowed to one entity.
    pub async fn list(
        &self,
        entity_type: Option<AuditEntity>,
        entity_id: Option<&str>,
        page: Page,
    ) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, actor, action, entity_type, entity_id, detail, reason, created_at
            FROM audit_log
            WHERE (?1 IS NULL OR entity_type = ?1)
              AND (?2 IS NULL OR entity_id = ?2)
            ORDER BY id DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries flagged for human review, newest first.
    pub async fn anomalies(&self, page: Page) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, actor, action, entity_type, entity_id, detail, reason, created_at
            FROM audit_log
            WHERE action IN ('order_cancelled_after_pick', 'order_deleted_after_pick')
            ORDER BY id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
