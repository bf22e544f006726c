//! # Order Lifecycle
//!
//! Transition legality and the stock effect each transition carries.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Order Lifecycle                                  │
//! │                                                                         │
//! │   ┌─────────┐  scan   ┌────────┐  pack  ┌────────┐  ship  ┌─────────┐  │
//! │   │ pending │────────►│ picked │───────►│ packed │───────►│ shipped │  │
//! │   └────┬────┘         └───┬────┘        └───┬────┘        └─────────┘  │
//! │        │ ship (consumes   │                 │    ship ▲                 │
//! │        │ reservations) ───┼─────────────────┼─────────┘                 │
//! │        │                  │                 │                           │
//! │        ▼ release          ▼ anomaly         ▼ anomaly                   │
//! │   ┌───────────────────────────────────────────────┐                     │
//! │   │                   cancelled                   │                     │
//! │   └───────────────────────────────────────────────┘                     │
//! │                                                                         │
//! │   pending → picked only through a scanner pick confirmation.           │
//! │   Backward, same-state and terminal moves are illegal.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The functions here decide; `stockyard-db` executes the decision inside
//! the transaction that holds the order row.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{OrderStatus, TaskStatus};

// =============================================================================
// Transition Plans
// =============================================================================

/// The stock effect of a legal manual transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// pending → shipped: every line is picked now, consuming its reservation.
    ShipUnpicked,
    /// picked/packed → shipped: stock already left; status change only.
    ShipPicked,
    /// picked → packed: status change only.
    Pack,
    /// pending → cancelled: release every line's reservation.
    CancelReleasing,
    /// picked/packed → cancelled: nothing can be restored; flag an anomaly.
    CancelAfterPick,
}

impl TransitionPlan {
    /// Whether the order's still-pending tasks must be cancelled.
    pub fn cancels_tasks(&self) -> bool {
        matches!(
            self,
            TransitionPlan::ShipUnpicked
                | TransitionPlan::CancelReleasing
                | TransitionPlan::CancelAfterPick
        )
    }
}

/// Decides whether a manually requested transition is legal.
///
/// ## Example
/// ```rust
/// use stockyard_core::lifecycle::{plan_transition, TransitionPlan};
/// use stockyard_core::OrderStatus;
///
/// let plan = plan_transition(1, OrderStatus::Picked, OrderStatus::Cancelled).unwrap();
/// assert_eq!(plan, TransitionPlan::CancelAfterPick);
///
/// // Only a scanner confirmation may move an order to picked.
/// assert!(plan_transition(1, OrderStatus::Pending, OrderStatus::Picked).is_err());
/// ```
pub fn plan_transition(
    order_id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> CoreResult<TransitionPlan> {
    use OrderStatus::*;

    let plan = match (from, to) {
        (Pending, Shipped) => TransitionPlan::ShipUnpicked,
        (Picked | Packed, Shipped) => TransitionPlan::ShipPicked,
        (Picked, Packed) => TransitionPlan::Pack,
        (Pending, Cancelled) => TransitionPlan::CancelReleasing,
        (Picked | Packed, Cancelled) => TransitionPlan::CancelAfterPick,
        _ => return Err(CoreError::IllegalTransition { order_id, from, to }),
    };

    Ok(plan)
}

// =============================================================================
// Deletion Plans
// =============================================================================

/// The stock effect of deleting an order, keyed off its current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPlan {
    /// Pending: reservations are released.
    ReleaseReservations,
    /// Picked or packed: stock already left, deletion is an anomaly.
    AfterPickAnomaly,
    /// Shipped or cancelled: the stock story is already finished.
    NoStockEffect,
}

pub fn plan_deletion(status: OrderStatus) -> DeletionPlan {
    match status {
        OrderStatus::Pending => DeletionPlan::ReleaseReservations,
        OrderStatus::Picked | OrderStatus::Packed => DeletionPlan::AfterPickAnomaly,
        OrderStatus::Shipped | OrderStatus::Cancelled => DeletionPlan::NoStockEffect,
    }
}

// =============================================================================
// Scanner Picks
// =============================================================================

/// Decides what a scanner pick linked to an order does to the order status.
///
/// ## Returns
/// - `Some(Picked)` when the order was pending and must advance
/// - `None` when the order is already picked (another line scanned)
/// - `IllegalTransition` for packed, shipped and cancelled orders
pub fn plan_scan_pick(order_id: i64, status: OrderStatus) -> CoreResult<Option<OrderStatus>> {
    match status {
        OrderStatus::Pending => Ok(Some(OrderStatus::Picked)),
        OrderStatus::Picked => Ok(None),
        from => Err(CoreError::IllegalTransition {
            order_id,
            from,
            to: OrderStatus::Picked,
        }),
    }
}

// =============================================================================
// Task Status
// =============================================================================

/// Checks a manual task status change.
///
/// Operators may finish or abandon work in progress and abandon work not
/// yet started. `pending → in_progress` happens through assignment only.
///
/// ## Errors
/// - `TaskClosed` when the task is already completed or cancelled
/// - `Validation` for any other target status
pub fn check_task_status(task_id: i64, from: TaskStatus, to: TaskStatus) -> CoreResult<()> {
    use TaskStatus::*;

    if !from.is_open() {
        return Err(CoreError::TaskClosed {
            task_id,
            status: from.to_string(),
        });
    }

    match (from, to) {
        (InProgress, Completed | Cancelled) | (Pending, Cancelled) => Ok(()),
        (InProgress, _) => Err(not_allowed(&[Completed, Cancelled])),
        _ => Err(not_allowed(&[Cancelled])),
    }
}

fn not_allowed(allowed: &[TaskStatus]) -> CoreError {
    ValidationError::NotAllowed {
        field: "status".to_string(),
        allowed: allowed.iter().map(|s| s.as_str().to_string()).collect(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_legal_transitions() {
        assert_eq!(plan_transition(1, Pending, Shipped), Ok(TransitionPlan::ShipUnpicked));
        assert_eq!(plan_transition(1, Picked, Shipped), Ok(TransitionPlan::ShipPicked));
        assert_eq!(plan_transition(1, Packed, Shipped), Ok(TransitionPlan::ShipPicked));
        assert_eq!(plan_transition(1, Picked, Packed), Ok(TransitionPlan::Pack));
        assert_eq!(plan_transition(1, Pending, Cancelled), Ok(TransitionPlan::CancelReleasing));
        assert_eq!(plan_transition(1, Packed, Cancelled), Ok(TransitionPlan::CancelAfterPick));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for to in OrderStatus::ALL {
            assert!(plan_transition(1, Shipped, to).is_err());
            assert!(plan_transition(1, Cancelled, to).is_err());
        }
    }

    #[test]
    fn test_manual_pick_backward_and_same_state_rejected() {
        assert_eq!(
            plan_transition(4, Pending, Picked),
            Err(CoreError::IllegalTransition {
                order_id: 4,
                from: Pending,
                to: Picked
            })
        );
        assert!(plan_transition(4, Pending, Packed).is_err());
        assert!(plan_transition(4, Packed, Picked).is_err());
        assert!(plan_transition(4, Picked, Picked).is_err());
        assert!(plan_transition(4, Pending, Pending).is_err());
    }

    #[test]
    fn test_cancels_tasks() {
        assert!(TransitionPlan::ShipUnpicked.cancels_tasks());
        assert!(TransitionPlan::CancelAfterPick.cancels_tasks());
        assert!(!TransitionPlan::Pack.cancels_tasks());
    }

    #[test]
    fn test_plan_deletion() {
        assert_eq!(plan_deletion(Pending), DeletionPlan::ReleaseReservations);
        assert_eq!(plan_deletion(Picked), DeletionPlan::AfterPickAnomaly);
        assert_eq!(plan_deletion(Packed), DeletionPlan::AfterPickAnomaly);
        assert_eq!(plan_deletion(Shipped), DeletionPlan::NoStockEffect);
        assert_eq!(plan_deletion(Cancelled), DeletionPlan::NoStockEffect);
    }

    #[test]
    fn test_plan_scan_pick() {
        assert_eq!(plan_scan_pick(2, Pending), Ok(Some(Picked)));
        assert_eq!(plan_scan_pick(2, Picked), Ok(None));
        assert!(plan_scan_pick(2, Packed).is_err());
        assert!(plan_scan_pick(2, Shipped).is_err());
        assert!(plan_scan_pick(2, Cancelled).is_err());
    }

    #[test]
    fn test_check_task_status() {
        use TaskStatus as T;

        assert_eq!(check_task_status(3, T::InProgress, T::Completed), Ok(()));
        assert_eq!(check_task_status(3, T::InProgress, T::Cancelled), Ok(()));
        assert_eq!(check_task_status(3, T::Pending, T::Cancelled), Ok(()));

        assert!(matches!(
            check_task_status(3, T::Pending, T::Completed),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            check_task_status(3, T::InProgress, T::Pending),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(
            check_task_status(3, T::Completed, T::Cancelled),
            Err(CoreError::TaskClosed {
                task_id: 3,
                status: "completed".to_string()
            })
        );
        assert!(check_task_status(3, T::Cancelled, T::Completed).is_err());
    }
}
