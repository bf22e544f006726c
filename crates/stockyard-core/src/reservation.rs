//! # Reservation Arithmetic
//!
//! Pure stock math used by the reservation manager in `stockyard-db`.
//!
//! ## Quantities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  on_hand   ████████████████████████████████████████  physical units    │
//! │  reserved  ██████████████                            promised units    │
//! │  available               ██████████████████████████  on_hand-reserved  │
//! │                                                                         │
//! │  reserve(q)       reserved += q           needs available >= q          │
//! │  release(q)       reserved -= min(q, reserved)                          │
//! │  commit_pick(q)   on_hand  -= q                                         │
//! │                   reserved -= min(q, cap, reserved)                     │
//! │  receive(q)       on_hand  += q                                         │
//! │  adjust(c)        on_hand   = c           needs c >= reserved           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is checked against values read *after* the row lock
//! was taken, so a plan that passes here is safe to write.

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::LineRequest;

// =============================================================================
// Batch Planning
// =============================================================================

/// A reservation request with duplicate SKUs merged.
///
/// ## Example
/// ```rust
/// use stockyard_core::reservation::ReservationBatch;
/// use stockyard_core::LineRequest;
///
/// let batch = ReservationBatch::from_lines(&[
///     LineRequest::new("B", 2),
///     LineRequest::new("A", 1),
///     LineRequest::new("B", 3),
/// ]);
///
/// // Caller order, merged.
/// assert_eq!(batch.requested(), vec![("B", 5), ("A", 1)]);
/// // Lock order is canonical.
/// assert_eq!(batch.lock_order(), vec!["A", "B"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationBatch {
    /// SKUs in first-appearance order.
    order: Vec<String>,
    /// Summed quantity per SKU.
    totals: BTreeMap<String, i64>,
}

impl ReservationBatch {
    pub fn from_lines(lines: &[LineRequest]) -> Self {
        let mut batch = ReservationBatch::default();
        for line in lines {
            batch.add(line.sku.trim(), line.quantity);
        }
        batch
    }

    pub fn add(&mut self, sku: &str, quantity: i64) {
        match self.totals.get_mut(sku) {
            Some(total) => *total += quantity,
            None => {
                self.order.push(sku.to_string());
                self.totals.insert(sku.to_string(), quantity);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// SKUs sorted; the order rows must be locked in.
    pub fn lock_order(&self) -> Vec<&str> {
        self.totals.keys().map(String::as_str).collect()
    }

    /// `(sku, total)` in the order the caller first mentioned each SKU.
    ///
    /// Validation walks this list so the first offending line the caller
    /// sent is the one reported.
    pub fn requested(&self) -> Vec<(&str, i64)> {
        self.order
            .iter()
            .filter_map(|sku| self.totals.get(sku).map(|qty| (sku.as_str(), *qty)))
            .collect()
    }

    pub fn total_for(&self, sku: &str) -> i64 {
        self.totals.get(sku).copied().unwrap_or(0)
    }
}

// =============================================================================
// Per-Row Checks
// =============================================================================

/// Verifies a reservation of `requested` fits the locked row.
pub fn check_reservable(sku: &str, on_hand: i64, reserved: i64, requested: i64) -> CoreResult<()> {
    let available = on_hand - reserved;
    if available < requested {
        return Err(CoreError::InsufficientStock {
            sku: sku.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// Amount a release actually removes; never drives `reserved` negative.
#[inline]
pub fn release_amount(reserved: i64, requested: i64) -> i64 {
    requested.min(reserved).max(0)
}

/// The effect of a physical pick on a locked row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickEffect {
    /// Units leaving `on_hand`.
    pub on_hand_delta: i64,
    /// Units leaving `reserved`.
    pub reserved_delta: i64,
}

/// Plans a pick of `quantity` against a locked row.
///
/// `reservation_cap` is how much of the pick was reserved for it. Zero means
/// the pick is unrelated to any reservation and may only take unreserved
/// stock; a linked pick may take anything on the shelf because it consumes
/// its own reservation.
///
/// ## Example
/// ```rust
/// use stockyard_core::reservation::plan_pick;
///
/// // Order reserved 10; the operator scans 10.
/// let effect = plan_pick("X", 100, 10, 10, 10).unwrap();
/// assert_eq!((effect.on_hand_delta, effect.reserved_delta), (10, 10));
///
/// // Unlinked pick cannot touch the reserved 10.
/// assert!(plan_pick("X", 15, 10, 6, 0).is_err());
/// ```
pub fn plan_pick(
    sku: &str,
    on_hand: i64,
    reserved: i64,
    quantity: i64,
    reservation_cap: i64,
) -> CoreResult<PickEffect> {
    let limit = if reservation_cap > 0 {
        on_hand
    } else {
        on_hand - reserved
    };

    if quantity > limit {
        return Err(CoreError::InsufficientStock {
            sku: sku.to_string(),
            available: limit,
            requested: quantity,
        });
    }

    let reserved_delta = quantity.min(reservation_cap).min(reserved).max(0);

    // Whatever stays reserved must still be on the shelf.
    if reserved - reserved_delta > on_hand - quantity {
        return Err(CoreError::InsufficientStock {
            sku: sku.to_string(),
            available: on_hand - reserved + reserved_delta,
            requested: quantity,
        });
    }

    Ok(PickEffect {
        on_hand_delta: quantity,
        reserved_delta,
    })
}

/// Plans a cycle-count correction.
///
/// ## Returns
/// The signed difference `counted - on_hand`.
pub fn plan_adjustment(on_hand: i64, reserved: i64, counted: i64) -> CoreResult<i64> {
    if counted < 0 {
        return Err(ValidationError::OutOfRange {
            field: "counted".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }

    if counted < reserved {
        return Err(ValidationError::OutOfRange {
            field: "counted".to_string(),
            min: reserved,
            max: i64::MAX,
        }
        .into());
    }

    Ok(counted - on_hand)
}

// =============================================================================
// Unit Tests
// =============================================================================
