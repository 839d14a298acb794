//! # bazaar-db: Database Layer for Bazaar POS
//!
//! This crate provides database access for Bazaar POS.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar POS Data Flow                             │
//! │                                                                         │
//! │  bazaar-console (checkout / renew / refund ...)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bazaar-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌────────────────┐  ┌──────────────────┐ │   │
//! │  │   │   Database    │  │  ShopScope     │  │  Migrations      │ │   │
//! │  │   │   (pool.rs)   │─►│  AdminPanel    │  │  (embedded)      │ │   │
//! │  │   │               │  │       │        │  │                  │ │   │
//! │  │   │ SqlitePool    │  │       ▼        │  │ 0001_initial_    │ │   │
//! │  │   │ authenticate  │  │  Repositories  │  │   schema.sql     │ │   │
//! │  │   └───────────────┘  └────────────────┘  └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, login, and the capability entry points
//! - [`scope`] - `ShopScope`, the per-shop capability
//! - [`admin`] - `AdminPanel`, the platform capability
//! - [`repository`] - Repository implementations
//! - [`migrations`] - Embedded database migrations
//! - [`auth`] - Password hashing
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("bazaar.db")).await?;
//!
//! let principal = db.authenticate("amina", "s3cret-pass").await?;
//! let shop = db.shop(&principal)?;
//!
//! let detail = shop.invoices().create_invoice(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod admin;
pub mod auth;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod scope;

// =============================================================================
// Re-exports
// =============================================================================

pub use admin::{AdminPanel, ShopOverview};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use scope::ShopScope;

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
pub use repository::shop::{ShopDeletion, ShopRepository};
pub use repository::subscription::SubscriptionRepository;
pub use repository::user::{StaffRepository, UserRepository};
