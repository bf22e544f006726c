//! # Validation Module
//!
//! Input validation for Stockyard operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum)                                        │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Shape checks (empty, length, charset, range)                      │
//! │  └── Runs before a transaction is opened                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine (inside the transaction)                              │
//! │  └── Stock and status checks against locked rows                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── CHECK (reserved <= on_hand)                                       │
//! │  ├── UNIQUE (sku), UNIQUE (order_number)                               │
//! │  └── Foreign keys, append-only triggers                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockyard_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("BOLT-M8").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::LineRequest;
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted SKU.
pub const MAX_SKU_LEN: usize = 50;

/// Longest accepted order number.
pub const MAX_ORDER_NUMBER_LEN: usize = 64;

/// Longest accepted free-text field (reasons, notes).
pub const MAX_NOTE_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use stockyard_core::validation::validate_sku;
///
/// assert!(validate_sku("BOLT-M8").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "product_name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "product_name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a human-readable order number.
///
/// ## Example
/// ```rust
/// use stockyard_core::validation::validate_order_number;
///
/// assert!(validate_order_number("SO-2024-0001").is_ok());
/// assert!(validate_order_number("  ").is_err());
/// ```
pub fn validate_order_number(order_number: &str) -> ValidationResult<()> {
    let order_number = order_number.trim();

    if order_number.is_empty() {
        return Err(ValidationError::Required {
            field: "order_number".to_string(),
        });
    }

    if order_number.len() > MAX_ORDER_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "order_number".to_string(),
            max: MAX_ORDER_NUMBER_LEN,
        });
    }

    Ok(())
}

/// Validates the opaque actor id supplied by the authentication layer.
pub fn validate_actor(actor: &str) -> ValidationResult<()> {
    if actor.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "actor".to_string(),
        });
    }

    if actor.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "actor".to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates an optional free-text field such as an adjustment reason.
///
/// ## Returns
/// The trimmed text, or `None` when absent or blank.
pub fn validate_note(field: &str, note: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if note.len() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    Ok(Some(note.to_string()))
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns everything)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or scan quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (1,000,000)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a physical count or opening balance. Zero is allowed.
pub fn validate_counted_quantity(counted: i64) -> ValidationResult<()> {
    if !(0..=MAX_LINE_QUANTITY).contains(&counted) {
        return Err(ValidationError::OutOfRange {
            field: "on_hand".to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the line list of a create-order request.
///
/// Lines are checked in the order the caller supplied them, so the first
/// offending line is the one reported.
///
/// ## Rules
/// - 1 to MAX_ORDER_LINES (100) lines
/// - Every line has a well-formed SKU and a valid quantity
pub fn validate_order_lines(lines: &[LineRequest]) -> ValidationResult<()> {
    if lines.is_empty() || lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::BadLength {
            field: "lines".to_string(),
            min: 1,
            max: MAX_ORDER_LINES,
        });
    }

    for line in lines {
        validate_sku(&line.sku)?;
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        // Valid SKUs
        assert!(validate_sku("BOLT-M8").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("pallet_1").is_ok());

        // Invalid SKUs
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_order_number() {
        assert!(validate_order_number("SO-1").is_ok());
        assert!(validate_order_number("").is_err());
        assert!(validate_order_number(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(1_000_000).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1_000_001).is_err());
    }

    #[test]
    fn test_validate_counted_quantity() {
        assert!(validate_counted_quantity(0).is_ok());
        assert!(validate_counted_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_order_lines_reports_first_bad_line() {
        let lines = vec![
            LineRequest::new("A", 1),
            LineRequest::new("B", 0),
            LineRequest::new("bad sku", 5),
        ];
        assert_eq!(
            validate_order_lines(&lines),
            Err(ValidationError::MustBePositive {
                field: "quantity".to_string()
            })
        );
    }

    #[test]
    fn test_validate_order_lines_bounds() {
        assert!(validate_order_lines(&[]).is_err());

        let too_many: Vec<_> = (0..=MAX_ORDER_LINES)
            .map(|i| LineRequest::new(format!("SKU-{i}"), 1))
            .collect();
        assert!(validate_order_lines(&too_many).is_err());
    }

    #[test]
    fn test_validate_note() {
        assert_eq!(validate_note("reason", None).unwrap(), None);
        assert_eq!(validate_note("reason", Some("   ")).unwrap(), None);
        assert_eq!(
            validate_note("reason", Some(" recount ")).unwrap().as_deref(),
            Some("recount")
        );
        assert!(validate_note("reason", Some(&"x".repeat(501))).is_err());
    }
}
