//! # Validation Module
//!
//! Record validation for Duka POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Checkout flow (out of scope here)                            │
//! │  ├── Builds line items, computes subtotal/tax/discount/total           │
//! │  └── Immediate cashier feedback                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Queue facade (duka-sync)                                     │
//! │  └── THIS MODULE: shape + arithmetic coherence of the frozen record    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── sync_state CHECK constraint                                       │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Coherence checks verify the frozen amounts against each other; they
//! never recompute or repair them. A record that fails here is a checkout
//! bug and must not reach the queue.
//!
//! ## Usage
//! ```rust,no_run
//! use duka_core::types::{LineItem, TransactionRecord};
//! use duka_core::validation::validate_record;
//!
//! let items = vec![LineItem::new("p-1", "CHAI", "Kenyan Chai", 7000, 2)];
//! let record = TransactionRecord::new(items, 14_000, 2240, 0, 16_240);
//! validate_record(&record).unwrap();
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::TransactionRecord;
use crate::{MAX_ITEM_QUANTITY, MAX_TRANSACTION_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a business transaction id.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 64 characters
///
/// The id is the remote ledger's idempotency key, so a blank or bloated
/// one would break deduplication downstream.
pub fn validate_business_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
///
/// ## Example
/// ```rust
/// use duka_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // KSh 10.99
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Record Validator
// =============================================================================

/// Validates a complete transaction record before it enters the queue.
///
/// ## Checks
/// 1. Business id present and sane
/// 2. At least one item, at most MAX_TRANSACTION_ITEMS
/// 3. Per item: non-empty sku/name, valid price and quantity,
///    line_total = unit_price × quantity
/// 4. subtotal = Σ line totals
/// 5. tax and discount non-negative, discount ≤ subtotal
/// 6. total = subtotal - discount + tax
///
/// All arithmetic is verified in i128 so the checks themselves cannot
/// overflow on hostile input.
pub fn validate_record(record: &TransactionRecord) -> CoreResult<()> {
    validate_business_id(&record.id)?;

    if record.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    }

    if record.items.len() > MAX_TRANSACTION_ITEMS {
        return Err(CoreError::TooManyItems {
            max: MAX_TRANSACTION_ITEMS,
        });
    }

    let mut line_sum: i128 = 0;
    for item in &record.items {
        if item.sku.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "sku".to_string(),
            }
            .into());
        }
        if item.name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }

        validate_price_cents(item.unit_price_cents)?;
        validate_quantity(item.quantity)?;

        let expected = item.unit_price_cents as i128 * item.quantity as i128;
        if item.line_total_cents as i128 != expected {
            return Err(CoreError::InconsistentAmounts {
                reason: format!(
                    "line total for {} is {} but unit price × quantity is {}",
                    item.sku, item.line_total_cents, expected
                ),
            });
        }

        line_sum += item.line_total_cents as i128;
    }

    if record.subtotal_cents as i128 != line_sum {
        return Err(CoreError::InconsistentAmounts {
            reason: format!(
                "subtotal is {} but line totals sum to {}",
                record.subtotal_cents, line_sum
            ),
        });
    }

    if record.tax_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "tax_cents".to_string(),
        }
        .into());
    }

    if record.discount_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "discount_cents".to_string(),
        }
        .into());
    }

    if record.discount_cents > record.subtotal_cents {
        return Err(CoreError::InconsistentAmounts {
            reason: format!(
                "discount {} exceeds subtotal {}",
                record.discount_cents, record.subtotal_cents
            ),
        });
    }

    let expected_total = record.subtotal_cents as i128 - record.discount_cents as i128
        + record.tax_cents as i128;
    if record.total_cents as i128 != expected_total {
        return Err(CoreError::InconsistentAmounts {
            reason: format!(
                "total is {} but subtotal - discount + tax is {}",
                record.total_cents, expected_total
            ),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineItem;

    /// A coherent two-item sale: KSh 100.00 subtotal, 16% VAT, no discount.
    fn sample_record() -> TransactionRecord {
        let items = vec![
            LineItem::new("p-1", "CHAPATI", "Chapati", 4000, 2),
            LineItem::new("p-2", "SUKUMA", "Sukuma Wiki", 2000, 1),
        ];
        TransactionRecord::new(items, 10_000, 1600, 0, 11_600)
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(validate_record(&sample_record()).is_ok());
    }

    #[test]
    fn test_validate_business_id() {
        assert!(validate_business_id("TXN-20260825120000000-9f3b1c").is_ok());
        assert!(validate_business_id("").is_err());
        assert!(validate_business_id("   ").is_err());
        assert!(validate_business_id(&"X".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut record = sample_record();
        record.items.clear();
        assert!(matches!(
            validate_record(&record),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_too_many_items_rejected() {
        let items: Vec<LineItem> = (0..=MAX_TRANSACTION_ITEMS)
            .map(|i| LineItem::new(format!("p-{i}"), format!("SKU-{i}"), "Item", 100, 1))
            .collect();
        let subtotal = items.len() as i64 * 100;
        let record = TransactionRecord::new(items, subtotal, 0, 0, subtotal);
        assert!(matches!(
            validate_record(&record),
            Err(CoreError::TooManyItems { .. })
        ));
    }

    #[test]
    fn test_line_total_mismatch_rejected() {
        let mut record = sample_record();
        record.items[0].line_total_cents += 1;
        record.subtotal_cents += 1;
        record.total_cents += 1;
        assert!(matches!(
            validate_record(&record),
            Err(CoreError::InconsistentAmounts { .. })
        ));
    }

    #[test]
    fn test_saturated_line_total_rejected() {
        // LineItem::new pins an overflowing product at i64::MAX; the i128
        // recomputation here must catch the disagreement.
        let items = vec![LineItem::new("p-1", "BULK", "Bulk Line", i64::MAX / 2, 3)];
        let record = TransactionRecord::new(items, i64::MAX, 0, 0, i64::MAX);
        assert!(matches!(
            validate_record(&record),
            Err(CoreError::InconsistentAmounts { .. })
        ));
    }

    #[test]
    fn test_subtotal_mismatch_rejected() {
        let mut record = sample_record();
        record.subtotal_cents += 50;
        record.total_cents += 50;
        assert!(matches!(
            validate_record(&record),
            Err(CoreError::InconsistentAmounts { .. })
        ));
    }

    #[test]
    fn test_total_identity_enforced() {
        let mut record = sample_record();
        record.total_cents += 1;
        assert!(matches!(
            validate_record(&record),
            Err(CoreError::InconsistentAmounts { .. })
        ));
    }

    #[test]
    fn test_discount_cannot_exceed_subtotal() {
        let mut record = sample_record();
        record.discount_cents = record.subtotal_cents + 1;
        record.total_cents = record.subtotal_cents - record.discount_cents + record.tax_cents;
        assert!(matches!(
            validate_record(&record),
            Err(CoreError::InconsistentAmounts { .. })
        ));
    }

    #[test]
    fn test_negative_tax_rejected() {
        let mut record = sample_record();
        record.tax_cents = -1;
        record.total_cents = record.subtotal_cents - record.discount_cents + record.tax_cents;
        assert!(validate_record(&record).is_err());
    }

    #[test]
    fn test_zero_priced_item_allowed() {
        // Promo item: free with purchase
        let items = vec![
            LineItem::new("p-1", "UGALI-BEEF", "Ugali & Beef Stew", 22_000, 1),
            LineItem::new("p-9", "PROMO-CUP", "Branded Cup", 0, 1),
        ];
        let record = TransactionRecord::new(items, 22_000, 3520, 0, 25_520);
        assert!(validate_record(&record).is_ok());
    }
}
