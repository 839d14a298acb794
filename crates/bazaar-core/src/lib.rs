//! # bazaar-core: Pure Business Logic for Bazaar POS
//!
//! This crate holds the business rules of the back office as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 bazaar-console (CLI) / web layer                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Principal + typed inputs               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────────┐ ┌──────────────┐  │   │
//! │  │   │  types   │ │  money   │ │   checkout   │ │ subscription │  │   │
//! │  │   │ Shop     │ │  Money   │ │  CartLine    │ │  Plan        │  │   │
//! │  │   │ Invoice  │ │ TaxRate  │ │  PricedCart  │ │  Renewal     │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────────┘ └──────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐                                    │   │
//! │  │   │  report  │ │validation│                                    │   │
//! │  │   └──────────┘ └──────────┘                                    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  bazaar-db (Database Layer)                     │   │
//! │  │        SQLite transactions, tenant-scoped repositories          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Shop, Product, Invoice, ...)
//! - [`money`] - Exact decimal `Money` and tax application
//! - [`checkout`] - Cart validation and pricing
//! - [`subscription`] - Plan table, renewal date math, access gating
//! - [`report`] - Dashboard aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::money::Money;
//! use bazaar_core::types::TaxRate;
//!
//! let price = Money::from_cents(1000); // 10.00
//! let gross = price.with_tax(TaxRate::from_bps(1000)) * 2;
//!
//! assert_eq!(gross, Money::from_cents(2200));
//! ```

pub mod checkout;
pub mod error;
pub mod money;
pub mod report;
pub mod subscription;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single cart line.
///
/// Guards against typing 1000 instead of 10 at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Low-stock threshold given to newly registered shops.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Currency given to newly registered shops (ISO 4217).
pub const DEFAULT_CURRENCY: &str = "USD";
