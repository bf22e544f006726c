//! # stockyard-core: Pure Fulfillment Rules for Stockyard
//!
//! This crate holds the business rules of the fulfillment engine as pure
//! functions with zero I/O dependencies. The storage crate (`stockyard-db`)
//! asks this crate *what* is allowed and *how much* to move, then performs
//! the writes inside a transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockyard Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP API (order management, handheld scanner)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               stockyard-db (engine + storage)                   │   │
//! │  │  OrderStateMachine ─► ReservationManager ─► Ledger / Tasks /    │   │
//! │  │                                              Audit              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ asks                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockyard-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌─────────────┐  ┌─────────┐ │   │
//! │  │   │   types   │  │  lifecycle  │  │ reservation │  │validation│ │   │
//! │  │   │  Order    │  │ transitions │  │  batch plan │  │  rules  │ │   │
//! │  │   │  Task     │  │  deletion   │  │  pick math  │  │         │ │   │
//! │  │   └───────────┘  └─────────────┘  └─────────────┘  └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InventoryItem, Order, Task, AuditEntry, ...)
//! - [`lifecycle`] - Order state machine rules
//! - [`reservation`] - Reservation batch planning and stock arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockyard_core::lifecycle::{plan_transition, TransitionPlan};
//! use stockyard_core::OrderStatus;
//!
//! // Shipping an order nobody scanned consumes its reservation.
//! let plan = plan_transition(7, OrderStatus::Pending, OrderStatus::Shipped).unwrap();
//! assert_eq!(plan, TransitionPlan::ShipUnpicked);
//!
//! // Shipped orders are terminal.
//! assert!(plan_transition(7, OrderStatus::Shipped, OrderStatus::Cancelled).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod reservation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single order line or scanner confirmation.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Maximum number of lines in a single order.
///
/// ## Business Reason
/// Keeps one reservation batch (and the rows it locks) bounded.
pub const MAX_ORDER_LINES: usize = 100;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 500;
