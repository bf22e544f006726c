//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockyard                              │
//! │                                                                         │
//! │  Client                      Rust Backend                               │
//! │  ──────                      ────────────                               │
//! │                                                                         │
//! │  POST /orders                                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<T>, ApiError>                                       │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  EngineError::Core(InsufficientStock) ──► 422 + details ───────►│  │
//! │  │  EngineError::Core(Validation)        ──► 400 ─────────────────►│  │
//! │  │  EngineError::Storage(..)             ──► error! log, 500 ─────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "INSUFFICIENT_STOCK",                                        │
//! │    "message": "Insufficient stock for Y: available 40, requested 50",   │
//! │    "details": { "sku": "Y", "available": 40, "requested": 50 } }        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures never leak to the client. The full error goes to the
//! log and the client sees an opaque message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use stockyard_core::{CoreError, ValidationError};
use stockyard_db::{DbError, EngineError, ErrorKind};
use tracing::error;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Order not found: 42"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Structured detail (offending SKU, quantities, states)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// No actor header (401)
    Unauthorized,

    /// Resource not found (404)
    NotFound,

    /// Duplicate order number or SKU (409)
    Conflict,

    /// Not enough stock (422)
    InsufficientStock,

    /// Order or task status forbids the request (422)
    IllegalStateTransition,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InsufficientStock | ErrorCode::IllegalStateTransition => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured detail.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Opaque 500. The cause is logged, never returned.
    pub fn internal(cause: &dyn std::fmt::Display) -> Self {
        error!(error = %cause, "Internal error while handling request");
        Self::new(ErrorCode::Internal, "Internal server error")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Conversions
// =============================================================================

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let code = match err.kind() {
            ErrorKind::Validation => ErrorCode::ValidationError,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::InsufficientStock => ErrorCode::InsufficientStock,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::IllegalStateTransition => ErrorCode::IllegalStateTransition,
            ErrorKind::Internal => return ApiError::internal(&err),
        };

        let details = err.as_core().and_then(core_details);
        ApiError {
            code,
            message: err.to_string(),
            details,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        EngineError::from(err).into()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        EngineError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

fn core_details(err: &CoreError) -> Option<Value> {
    match err {
        CoreError::InsufficientStock {
            sku,
            available,
            requested,
        } => Some(json!({ "sku": sku, "available": available, "requested": requested })),
        CoreError::IllegalTransition { order_id, from, to } => {
            Some(json!({ "order_id": order_id, "from": from, "to": to }))
        }
        CoreError::TaskClosed { task_id, status } => {
            Some(json!({ "task_id": task_id, "status": status }))
        }
        CoreError::SkuNotFound(sku) => Some(json!({ "sku": sku })),
        CoreError::Validation(v) => validation_field(v).map(|field| json!({ "field": field })),
        _ => None,
    }
}

fn validation_field(err: &ValidationError) -> Option<&str> {
    match err {
        ValidationError::Required { field }
        | ValidationError::TooLong { field, .. }
        | ValidationError::OutOfRange { field, .. }
        | ValidationError::MustBePositive { field }
        | ValidationError::InvalidFormat { field, .. }
        | ValidationError::NotAllowed { field, .. }
        | ValidationError::BadLength { field, .. } => Some(field),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;
