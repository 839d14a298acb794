//! # Repository Module
//!
//! Database repository implementations for Bazaar POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ShopScope / AdminPanel                                                │
//! │       │                                                                 │
//! │       │  scope.invoices().create_invoice(&request)                     │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── create_invoice(&self, request)   one transaction                  │
//! │  ├── pay_invoice(&self, id)           one transaction                  │
//! │  └── refund_invoice(&self, id)        one transaction                  │
//! │       │                                                                 │
//! │       │  SQL (shop_id bound on every statement)                        │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Helpers that must run inside a caller's transaction take a
//! `&mut SqliteConnection` instead of the pool.
//!
//! ## Available Repositories
//!
//! - [`shop::ShopRepository`] - Shop records, settings, cascade delete
//! - [`user::UserRepository`] / [`user::StaffRepository`] - Accounts
//! - [`product::ProductRepository`] - Catalogue and stock
//! - [`customer::CustomerRepository`] - Customer ledger
//! - [`invoice::InvoiceRepository`] - Checkout and invoice lifecycle
//! - [`expense::ExpenseRepository`] - Shop expenses
//! - [`subscription::SubscriptionRepository`] - Renewals and history

pub mod customer;
pub mod expense;
pub mod invoice;
pub mod product;
pub mod shop;
pub mod subscription;
pub mod user;

use uuid::Uuid;

/// Generates a new entity id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trims an optional text field, mapping blank to `None`.
pub(crate) fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
