//! # Stockyard API
//!
//! HTTP surface of the fulfillment engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Stockyard API Routes                            │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌───────────────────┐ │
//! │  │  /orders           │  │  /inventory        │  │  /scanner         │ │
//! │  │                    │  │                    │  │                   │ │
//! │  │ • POST   create    │  │ • POST   register  │  │ • POST confirm    │ │
//! │  │ • GET    list/get  │  │ • GET    list/get  │  │ • GET  lookup     │ │
//! │  │ • PATCH  status    │  │ • GET    movements │  │                   │ │
//! │  │ • DELETE           │  │ • POST   receive   │  │                   │ │
//! │  │ • GET    tasks     │  │ • POST   adjust    │  │                   │ │
//! │  └────────────────────┘  └────────────────────┘  └───────────────────┘ │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌───────────────────┐ │
//! │  │  /tasks            │  │  /audit            │  │  /health          │ │
//! │  │ • GET list/get     │  │ • GET list         │  │ • GET             │ │
//! │  │ • POST create      │  │ • GET anomalies    │  │                   │ │
//! │  │ • POST assign      │  │                    │  │                   │ │
//! │  │ • PATCH status     │  │                    │  │                   │ │
//! │  └────────────────────┘  └────────────────────┘  └───────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `STOCKYARD_HTTP_PORT` - HTTP port (default: 8080)
//! - `STOCKYARD_BIND_ADDRESS` - Interface to bind (default: 0.0.0.0)
//! - `STOCKYARD_DATABASE_PATH` - SQLite file (default: ./stockyard.db)
//! - `STOCKYARD_DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `STOCKYARD_DB_BUSY_TIMEOUT_SECS` - Writer-lock wait (default: 5)
//! - `RUST_LOG` - Log filter (default: info)
//!
//! Every mutating request needs an `x-actor-id` header; the value is
//! recorded on every movement and audit entry it produces.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use stockyard_db::Database;
use tower_http::trace::TraceLayer;

// Re-exports
pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Arc<Self> {
        Arc::new(AppState { db })
    }
}

/// Builds the full router with request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    routes::build_router(state).layer(TraceLayer::new_for_http())
}
