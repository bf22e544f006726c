//! # Error Types
//!
//! Domain-specific error types for stockyard-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockyard-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  stockyard-db errors (separate crate)                                  │
//! │  ├── DbError          - Storage failures                               │
//! │  └── EngineError      - What engine operations return                  │
//! │                                                                         │
//! │  stockyard-api errors                                                  │
//! │  └── ApiError         - What HTTP callers see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError → Client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries the detail a caller needs to build a precise
//! message: the offending SKU, current vs. requested quantity, the order's
//! current status.

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// All of these are detected before any mutation; the enclosing
/// transaction rolls back and nothing is applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No inventory record exists for the SKU.
    #[error("SKU not found: {0}")]
    SkuNotFound(String),

    /// No order exists with the ID.
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    /// No task exists with the ID.
    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    /// Not enough stock to reserve, pick or ship.
    ///
    /// ## When This Occurs
    /// ```text
    /// Create order (X × 50)
    ///      │
    ///      ▼
    /// Lock X: on_hand=40, reserved=0 → available=40
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "X", available: 40, requested: 50 }
    ///      │
    ///      ▼
    /// Transaction rolls back, no order row exists
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// An order with this number already exists.
    #[error("Order number '{0}' already exists")]
    DuplicateOrderNumber(String),

    /// An inventory record with this SKU already exists.
    #[error("SKU '{0}' already exists")]
    DuplicateSku(String),

    /// The order's current status does not allow the requested move.
    ///
    /// ## When This Occurs
    /// - Cancelling a shipped order
    /// - Cancelling an already cancelled order
    /// - Moving backwards (packed → picked)
    /// - Scanning a pick against a packed order
    #[error("Order {order_id} cannot move from {from} to {to}")]
    IllegalTransition {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The task is finished and can no longer be changed.
    #[error("Task {task_id} is {status} and cannot be modified")]
    TaskClosed { task_id: i64, status: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before a transaction is even opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., SKU with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Collection is empty or too large.
    #[error("{field} must contain between {min} and {max} entries")]
    BadLength { field: String, min: usize, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
