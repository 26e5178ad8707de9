//! # Domain Types
//!
//! Core domain types used throughout Duka POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌───────────────────────┐        ┌───────────────────────┐            │
//! │  │  TransactionRecord    │  1..*  │       LineItem        │            │
//! │  │  ───────────────────  │───────►│  ───────────────────  │            │
//! │  │  id (business id)     │        │  sku / name snapshot  │            │
//! │  │  subtotal/tax/total   │        │  unit_price_cents     │            │
//! │  │  created_at (frozen)  │        │  quantity             │            │
//! │  │  sync_state (mutable) │        │  line_total_cents     │            │
//! │  └───────────────────────┘        └───────────────────────┘            │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    TaxRate      │   │   SyncState     │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  bps (u32)      │   │  Pending        │                             │
//! │  │  1600 = 16%     │   │  Synced         │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frozen Snapshot Rule
//! Everything in a `TransactionRecord` except `sync_state` is captured at
//! checkout and never recomputed afterwards. The sync layer transmits these
//! values verbatim; it does not re-derive totals or re-price items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1600 bps = 16% (the standard VAT rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Sync State
// =============================================================================

/// Where a queued transaction stands with the remote ledger.
///
/// There is deliberately no `Failed` terminal state: a record whose
/// submission failed stays `Pending` and will be attempted again on a
/// later pass. The only transition is `Pending → Synced`, taken exactly
/// once, after the ledger has confirmed acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Durably recorded locally, not yet accepted by the remote ledger.
    Pending,
    /// Accepted by the remote ledger at least once.
    Synced,
}

impl SyncState {
    /// Checks if the record still awaits the ledger.
    #[inline]
    pub const fn is_pending(&self) -> bool {
        matches!(self, SyncState::Pending)
    }

    /// Checks if the record was accepted by the ledger.
    #[inline]
    pub const fn is_synced(&self) -> bool {
        matches!(self, SyncState::Synced)
    }
}

impl Default for SyncState {
    fn default() -> Self {
        SyncState::Pending
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Pending => write!(f, "pending"),
            SyncState::Synced => write!(f, "synced"),
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A line item in a transaction.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog reference for the product sold.
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// Line total (unit_price × quantity), computed once at checkout.
    pub line_total_cents: i64,
}

impl LineItem {
    /// Builds a line item, computing the line total from price and quantity.
    ///
    /// The multiply saturates at the i64 limits instead of overflowing.
    /// A saturated total never reaches the queue: the coherence check in
    /// `validate_record` recomputes the product in i128 and rejects any
    /// record whose stored total disagrees.
    pub fn new(
        product_id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price_cents: i64,
        quantity: i64,
    ) -> Self {
        LineItem {
            product_id: product_id.into(),
            sku: sku.into(),
            name: name.into(),
            unit_price_cents,
            quantity,
            line_total_cents: unit_price_cents.saturating_mul(quantity),
        }
    }

    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Transaction Record
// =============================================================================

/// A finalized sale, as enqueued for ledger synchronization.
///
/// The amounts were computed by the checkout flow and are carried here
/// verbatim. `id` is the business id: client-generated, unique, and the
/// key the remote ledger deduplicates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Business id, assigned at creation. See [`generate_business_id`].
    pub id: String,
    /// Ordered line-item snapshots captured at checkout.
    pub items: Vec<LineItem>,
    /// Sum of line totals, in cents.
    pub subtotal_cents: i64,
    /// Tax charged, in cents.
    pub tax_cents: i64,
    /// Absolute discount applied, in cents.
    pub discount_cents: i64,
    /// Amount due: subtotal - discount + tax, in cents.
    pub total_cents: i64,
    /// When the sale was finalized.
    pub created_at: DateTime<Utc>,
    /// The only mutable field; changed exclusively by the sync engine.
    pub sync_state: SyncState,
}

impl TransactionRecord {
    /// Creates a pending record with a fresh business id and timestamp.
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::types::{LineItem, TransactionRecord};
    ///
    /// let items = vec![LineItem::new("p-1", "CHAPATI", "Chapati", 4000, 2)];
    /// let record = TransactionRecord::new(items, 8000, 1280, 0, 9280);
    /// assert!(record.sync_state.is_pending());
    /// assert!(record.id.starts_with("TXN-"));
    /// ```
    pub fn new(
        items: Vec<LineItem>,
        subtotal_cents: i64,
        tax_cents: i64,
        discount_cents: i64,
        total_cents: i64,
    ) -> Self {
        TransactionRecord {
            id: generate_business_id(),
            items,
            subtotal_cents,
            tax_cents,
            discount_cents,
            total_cents,
            created_at: Utc::now(),
            sync_state: SyncState::Pending,
        }
    }

    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Returns the tax as Money.
    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    /// Returns the discount as Money.
    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Business Id Generation
// =============================================================================

/// Generates a business transaction id in format: TXN-YYYYMMDDHHMMSSmmm-XXXXXX
///
/// ## Format
/// - YYYYMMDDHHMMSSmmm: UTC timestamp to the millisecond (sorts roughly
///   by creation time)
/// - XXXXXX: 6 hex chars of entropy (UUID v4)
///
/// ## Example
/// `TXN-20260825143501042-9f3b1c`
///
/// Uniqueness needs no coordination, so ids can be minted offline. The
/// remote ledger treats this id as the idempotency key: submitting the
/// same id twice settles the same transaction once.
pub fn generate_business_id() -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let entropy = Uuid::new_v4().simple().to_string();
    format!("TXN-{}-{}", stamp, &entropy[..6])
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1600);
        assert_eq!(rate.bps(), 1600);
        assert!((rate.percentage() - 16.0).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(16.0);
        assert_eq!(rate.bps(), 1600);
    }

    #[test]
    fn test_sync_state_default_is_pending() {
        let state = SyncState::default();
        assert_eq!(state, SyncState::Pending);
        assert!(state.is_pending());
        assert!(!state.is_synced());
    }

    #[test]
    fn test_line_item_total() {
        let item = LineItem::new("p-1", "MANDAZI", "Mandazi", 5000, 4);
        assert_eq!(item.line_total_cents, 20_000);
        assert_eq!(item.line_total(), item.unit_price() * 4);
    }

    #[test]
    fn test_line_total_saturates_instead_of_wrapping() {
        // Construction must not panic on a pathological price × quantity;
        // the pinned total then fails record validation downstream.
        let item = LineItem::new("p-1", "BULK", "Bulk Line", i64::MAX, 2);
        assert_eq!(item.line_total_cents, i64::MAX);
    }

    #[test]
    fn test_new_record_is_pending() {
        let items = vec![LineItem::new("p-1", "CHAI", "Kenyan Chai", 7000, 1)];
        let record = TransactionRecord::new(items, 7000, 1120, 0, 8120);
        assert!(record.sync_state.is_pending());
        assert_eq!(record.total().cents(), 8120);
    }

    #[test]
    fn test_business_id_shape() {
        let id = generate_business_id();
        // TXN- + 17 digit timestamp + - + 6 hex chars
        assert!(id.starts_with("TXN-"));
        assert_eq!(id.len(), 4 + 17 + 1 + 6);
        let suffix = &id[id.len() - 6..];
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_business_ids_are_unique() {
        let a = generate_business_id();
        let b = generate_business_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_items_blob_round_trip() {
        let items = vec![
            LineItem::new("p-1", "JOLLOF", "Jollof Rice", 18_000, 1),
            LineItem::new("p-2", "MANDAZI", "Mandazi", 5000, 3),
        ];
        let json = serde_json::to_string(&items).unwrap();
        let back: Vec<LineItem> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, items);
    }
}
