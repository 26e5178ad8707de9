//! # duka-core: Pure Business Logic for Duka POS
//!
//! This crate is the **heart** of Duka POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Duka POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Checkout Flow (external)                     │   │
//! │  │    Cart ──► Totals ──► Finalize ──► TransactionRecord          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ duka-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │   money   │  │ validation│                  │   │
//! │  │   │  Record   │  │   Money   │  │   rules   │                  │   │
//! │  │   │ LineItem  │  │  TaxCalc  │  │  checks   │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    duka-db (Database Layer)                     │   │
//! │  │          SQLite transaction queue, migrations, repository       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    duka-sync (Sync Engine)                      │   │
//! │  │        connectivity monitor, ledger uplink, queue facade        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (TransactionRecord, LineItem, SyncState, TaxRate)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Record validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Frozen Amounts**: Record totals are computed once at checkout, never recomputed
//!
//! ## Example Usage
//!
//! ```rust
//! use duka_core::money::Money;
//! use duka_core::types::TaxRate;
//!
//! // Create money from cents (never from floats!)
//! let subtotal = Money::from_cents(10_000); // KSh 100.00
//!
//! // Standard 16% VAT
//! let vat = TaxRate::from_bps(duka_core::STANDARD_VAT_BPS);
//! let tax = subtotal.calculate_tax(vat);
//!
//! assert_eq!(tax.cents(), 1600);              // KSh 16.00
//! assert_eq!((subtotal + tax).cents(), 11_600); // KSh 116.00
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use duka_core::Money` instead of
// `use duka_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use validation::validate_record;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// ISO 4217 currency code carried in every ledger submission.
///
/// ## Why a constant?
/// The till operates in a single currency; the ledger schema still carries
/// the code explicitly so multi-currency deployments stay possible without
/// a data migration.
pub const CURRENCY: &str = "KES";

/// Standard VAT rate in basis points (16%).
///
/// Used as the default when a deployment does not configure its own rate.
pub const STANDARD_VAT_BPS: u32 = 1600;

/// Maximum items allowed in a single transaction
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
/// Can be made configurable per-deployment in future versions.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Maximum quantity of a single item in a transaction
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
/// Configurable per-deployment in future versions.
pub const MAX_ITEM_QUANTITY: i64 = 999;
