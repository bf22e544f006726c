//! # stockyard-db: Storage and Fulfillment Engine for Stockyard
//!
//! This crate owns the SQLite database and every transaction that changes
//! stock, orders, tasks or the audit trail.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockyard Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /orders, POST /scanner/confirm, ...)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockyard-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │   Services    │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ OrderState-   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│   Machine     │    │ 001_initial_ │  │   │
//! │  │   │ busy_timeout  │    │ Reservation-  │    │   schema.sql │  │   │
//! │  │   │               │    │   Manager     │    │              │  │   │
//! │  │   │               │    │ ScanService   │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                ▼                                │   │
//! │  │              Repositories: ledger, orders, tasks, audit        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage and engine error types
//! - [`repository`] - Table access (reads on the pool, writes in a transaction)
//! - [`service`] - Order state machine, reservation manager, scanner
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockyard_db::{Database, DbConfig};
//! use stockyard_core::{LineRequest, OrderStatus};
//!
//! let db = Database::new(DbConfig::new("stockyard.db")).await?;
//!
//! let order = db
//!     .order_machine()
//!     .create_order("clerk-1", "SO-1001", &[LineRequest::new("BOLT-M8", 10)])
//!     .await?;
//!
//! db.order_machine()
//!     .transition_order_status("clerk-1", order.order.id, OrderStatus::Shipped)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, EngineError, EngineResult, ErrorKind};
pub use pool::{Database, DbConfig};

pub use repository::audit::AuditRecorder;
pub use repository::inventory::InventoryLedger;
pub use repository::order::OrderRepository;
pub use repository::task::TaskDispatcher;
pub use service::order::OrderStateMachine;
pub use service::reservation::ReservationManager;
pub use service::scanner::ScanService;
