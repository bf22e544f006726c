//! # Engine Services
//!
//! Operations that span several tables and therefore own a transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   OrderStateMachine          ScanService                               │
//! │         │                         │                                     │
//! │         └──────────┬──────────────┘                                     │
//! │                    ▼                                                    │
//! │           ReservationManager  (locking + stock math)                   │
//! │                    │                                                    │
//! │        ┌───────────┼──────────────┬─────────────────┐                   │
//! │        ▼           ▼              ▼                 ▼                   │
//! │   InventoryLedger  OrderRepo   TaskDispatcher   AuditRecorder          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod order;
pub mod reservation;
pub mod scanner;
