//! # Domain Types
//!
//! Core domain types used throughout Stockyard.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  InventoryItem  │   │      Order      │   │    OrderLine    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku (unique)   │◄──│  order_number   │──►│  order_id (FK)  │       │
//! │  │  on_hand        │   │  status         │   │  sku            │       │
//! │  │  reserved       │   │                 │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ MovementRecord  │   │      Task       │   │   AuditEntry    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  inbound        │   │  TaskPayload    │   │  actor, action  │       │
//! │  │  outbound       │   │  (tagged enum)  │   │  entity, detail │       │
//! │  │  adjustment     │   │  status         │   │  reason         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │         append-only                                append-only          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! - Inventory is keyed by SKU everywhere; the numeric `id` is a row handle.
//! - Orders have a numeric `id` (relations, task correlation) and a
//!   human-readable `order_number` (unique).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

// =============================================================================
// Inventory
// =============================================================================

/// The per-SKU stock record.
///
/// ## Invariant
/// `0 <= reserved <= on_hand` at all times. The storage layer enforces it
/// with CHECK constraints as a backstop; the engine never attempts a write
/// that would violate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: i64,

    /// Stock keeping unit - the business key.
    pub sku: String,

    pub product_name: String,

    /// Physical units in the building.
    pub on_hand: i64,

    /// Units promised to unfulfilled orders.
    pub reserved: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Units that can still be newly reserved.
    #[inline]
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }
}

/// Input for registering a new SKU in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInventoryItem {
    pub sku: String,
    pub product_name: String,
    /// Opening on-hand quantity. Recorded as an inbound movement when > 0.
    #[serde(default)]
    pub on_hand: i64,
}

// =============================================================================
// Movements
// =============================================================================

/// Kind of physical stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock arrived (receiving).
    Inbound,
    /// Stock left (pick or shipment).
    Outbound,
    /// Count correction; quantity is signed.
    Adjustment,
}

/// One physical stock change. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MovementRecord {
    pub id: i64,
    pub sku: String,
    pub movement_type: MovementType,
    /// Unsigned for inbound/outbound, signed for adjustment.
    pub quantity: i64,
    pub order_id: Option<i64>,
    pub actor: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ```text
/// pending ──► picked ──► packed ──► shipped
///    │           │          │
///    └───────────┴──────────┴──────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created; stock is reserved, nothing physically moved.
    Pending,
    /// At least one line was scanned off the shelf.
    Picked,
    /// Boxed and waiting for the carrier.
    Packed,
    /// Left the building. Terminal.
    Shipped,
    /// Abandoned. Terminal.
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Picked,
        OrderStatus::Packed,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Picked => "picked",
            OrderStatus::Packed => "packed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Shipped and cancelled orders accept no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line of an order. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub sku: String,
    pub quantity: i64,
}

/// A requested line in a create-order call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub sku: String,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(sku: impl Into<String>, quantity: i64) -> Self {
        LineRequest {
            sku: sku.into(),
            quantity,
        }
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

// =============================================================================
// Tasks
// =============================================================================

/// Kind of warehouse-floor work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Pick,
    PutAway,
    CycleCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Work that has not been finished or abandoned.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a task is about, resolved when the task is created.
///
/// Consumers match on the variant instead of digging through untyped JSON.
/// Stored as JSON with a `kind` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Take `quantity` of `sku` off the shelf for an order line.
    Pick {
        order_id: i64,
        order_number: String,
        sku: String,
        quantity: i64,
    },
    /// Shelve received stock.
    PutAway { sku: String, quantity: i64 },
    /// Count a SKU's shelf.
    CycleCount { sku: String },
}

impl TaskPayload {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskPayload::Pick { .. } => TaskType::Pick,
            TaskPayload::PutAway { .. } => TaskType::PutAway,
            TaskPayload::CycleCount { .. } => TaskType::CycleCount,
        }
    }

    /// The SKU the task refers to (every variant has one).
    pub fn sku(&self) -> &str {
        match self {
            TaskPayload::Pick { sku, .. }
            | TaskPayload::PutAway { sku, .. }
            | TaskPayload::CycleCount { sku } => sku,
        }
    }

    /// The order the task is correlated to, if any.
    pub fn order_id(&self) -> Option<i64> {
        match self {
            TaskPayload::Pick { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

/// A unit of warehouse-floor work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Task {
    pub id: i64,
    pub task_type: TaskType,
    pub status: TaskStatus,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub payload: TaskPayload,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Audit
// =============================================================================

/// Action tag of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    OrderCreated,
    OrderStatusChanged,
    OrderCancelled,
    /// Anomaly: cancelled after stock physically left the shelves.
    OrderCancelledAfterPick,
    OrderDeleted,
    /// Anomaly: deleted after stock physically left the shelves.
    OrderDeletedAfterPick,
    ScannerPick,
    ScannerReceive,
    StockReceived,
    StockAdjusted,
    InventoryCreated,
    TaskCreated,
    TaskAssigned,
    TaskStatusChanged,
}

impl AuditAction {
    /// Entries that need human review rather than automatic correction.
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            AuditAction::OrderCancelledAfterPick | AuditAction::OrderDeletedAfterPick
        )
    }
}

/// The kind of entity an audit entry documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Order,
    Inventory,
    Task,
    Scanner,
}

/// An immutable audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AuditEntry {
    pub id: i64,
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    #[ts(type = "unknown")]
    pub detail: serde_json::Value,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An audit entry about to be written.
///
/// ## Example
/// ```rust
/// use stockyard_core::{AuditAction, AuditEntity, AuditRecord};
///
/// let record = AuditRecord::new("user-7", AuditAction::OrderCreated, AuditEntity::Order)
///     .entity_id(42)
///     .detail(serde_json::json!({ "order_number": "SO-1" }));
/// assert_eq!(record.entity_id.as_deref(), Some("42"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: Option<String>,
    pub detail: serde_json::Value,
    pub reason: Option<String>,
}

impl AuditRecord {
    pub fn new(actor: impl Into<String>, action: AuditAction, entity_type: AuditEntity) -> Self {
        AuditRecord {
            actor: actor.into(),
            action,
            entity_type,
            entity_id: None,
            detail: serde_json::Value::Object(Default::default()),
            reason: None,
        }
    }

    pub fn entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// What the handheld scanner confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    Pick,
    Receive,
}

impl ScanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanAction::Pick => "pick",
            ScanAction::Receive => "receive",
        }
    }
}

/// Result of a scanner confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScanConfirmation {
    /// Reference the handheld shows the operator.
    pub confirmation_id: String,
    pub sku: String,
    pub action: ScanAction,
    pub quantity: i64,
    pub order_id: Option<i64>,
    /// Stock after the scan was applied.
    pub on_hand: i64,
    pub reserved: i64,
    /// Task marked completed by the scan, if one matched.
    pub completed_task_id: Option<i64>,
    pub message: String,
}

/// What the scanner shows after reading a barcode.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScanLookup {
    pub item: InventoryItem,
    pub pending_tasks: Vec<Task>,
}

// =============================================================================
// Pagination
// =============================================================================

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// Builds a page, clamping the limit to `1..=MAX_PAGE_LIMIT`.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Page {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
