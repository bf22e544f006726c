//! # Repository Module
//!
//! Storage access for Stockyard tables.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads (pool)                      Writes (caller's transaction)       │
//! │  ─────────────                     ──────────────────────────────      │
//! │  db.inventory().get_by_sku(..)     inventory::lock_item(&mut tx, ..)   │
//! │  db.orders().get_detail(..)        order::insert_order(&mut tx, ..)    │
//! │  db.tasks().list(..)               task::create_pick_task(&mut tx, ..) │
//! │  db.audit().list(..)               AuditRecorder::record(&mut tx, ..)  │
//! │                                                                         │
//! │  Transaction helpers are crate-private: only the services in           │
//! │  `crate::service` decide what gets locked and in which order.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InventoryLedger`](inventory::InventoryLedger) - Stock records and movements
//! - [`OrderRepository`](order::OrderRepository) - Orders and lines
//! - [`TaskDispatcher`](task::TaskDispatcher) - Warehouse-floor tasks
//! - [`AuditRecorder`](audit::AuditRecorder) - Audit trail

pub mod audit;
pub mod inventory;
pub mod order;
pub mod task;
