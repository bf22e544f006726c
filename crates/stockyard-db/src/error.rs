//! # Database & Engine Error Types
//!
//! Error types for storage operations and for the fulfillment engine.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (stockyard-core)        │
//! │       │                                   │                             │
//! │       ▼                                   │                             │
//! │  DbError ← adds categorization            │                             │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │  EngineError (this module) ← what engine operations return             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (stockyard-api) ← serialized for HTTP callers                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use stockyard_core::{CoreError, ValidationError};

// =============================================================================
// DbError
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Registering a SKU twice
    /// - Reusing an order number
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Order line naming a SKU with no inventory record
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint or append-only trigger rejected the write.
    ///
    /// The engine validates against locked rows first, so reaching this
    /// means a bug or a write from outside the engine.
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") || msg.contains("append-only") {
                    DbError::ConstraintViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// EngineError
// =============================================================================

/// Classification every engine error falls into.
///
/// The HTTP layer maps these to status codes; tests assert on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    Conflict,
    IllegalStateTransition,
    Internal,
}

/// Errors returned by engine operations (order machine, reservations,
/// scanner, dispatcher).
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the operation. Nothing was written.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure. Logged in full by the caller, opaque to clients.
    #[error(transparent)]
    Storage(DbError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(err) => match err {
                CoreError::SkuNotFound(_)
                | CoreError::OrderNotFound(_)
                | CoreError::TaskNotFound(_) => ErrorKind::NotFound,
                CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                CoreError::DuplicateOrderNumber(_) | CoreError::DuplicateSku(_) => {
                    ErrorKind::Conflict
                }
                CoreError::IllegalTransition { .. } | CoreError::TaskClosed { .. } => {
                    ErrorKind::IllegalStateTransition
                }
                CoreError::Validation(_) => ErrorKind::Validation,
            },
            EngineError::Storage(DbError::NotFound { .. }) => ErrorKind::NotFound,
            EngineError::Storage(DbError::UniqueViolation { .. }) => ErrorKind::Conflict,
            EngineError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// The business error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(err) => Some(err),
            EngineError::Storage(_) => None,
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        EngineError::Storage(err)
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Storage(err.into())
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(err.into())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_kinds() {
        let err: EngineError = CoreError::InsufficientStock {
            sku: "X".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let err: EngineError = CoreError::DuplicateOrderNumber("SO-1".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: EngineError = ValidationError::Required {
            field: "sku".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: EngineError = DbError::PoolExhausted.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.as_core().is_none());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: EngineError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
