//! # Error Types
//!
//! Domain-specific error types for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bazaar-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bazaar-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Console errors (in app)                                               │
//! │  └── ApiError         - What the operator sees ({code, message})       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries the id (and where useful the name) of the entity
//! that caused it, so callers can render an actionable message.

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of a failure.
///
/// Callers branch on the kind rather than on individual variants, e.g. to
/// retry on `ConcurrencyConflict` or map `NotFound` to a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    InvalidStateTransition,
    ConcurrencyConflict,
    Unauthorized,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout was called with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Product does not exist or belongs to another shop.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer does not exist or belongs to another shop.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Invoice does not exist or belongs to another shop.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Shop does not exist.
    #[error("Shop not found: {0}")]
    ShopNotFound(String),

    /// Insufficient stock to complete a checkout.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (Cola × 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Cola", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Cola in stock"
    /// ```
    #[error("Insufficient stock for {name} ({product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// Invoice is not in a state that allows the requested transition.
    #[error("Invoice {invoice_id} cannot move from {from} to {to}")]
    InvalidStateTransition {
        invoice_id: String,
        from: String,
        to: String,
    },

    /// Subscription plan name is not in the plan table.
    #[error("Unknown subscription plan: {0}")]
    UnknownPlan(String),

    /// A concurrent writer changed the row between check and update.
    ///
    /// The whole operation can be retried.
    #[error("Concurrent update on {entity} {id}, please retry")]
    ConcurrencyConflict { entity: String, id: String },

    /// Caller lacks the role or tenancy required for the operation.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Username or password did not match.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Shop was switched off by a platform administrator.
    #[error("Shop {0} is suspended")]
    ShopSuspended(String),

    /// Shop's paid access window has ended.
    #[error("Subscription for shop {0} has expired")]
    SubscriptionExpired(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an AccessDenied error.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        CoreError::AccessDenied(reason.into())
    }

    /// Creates a ConcurrencyConflict error.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::ConcurrencyConflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::EmptyCart | CoreError::UnknownPlan(_) | CoreError::Validation(_) => {
                ErrorKind::Validation
            }
            CoreError::ProductNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::InvoiceNotFound(_)
            | CoreError::ShopNotFound(_) => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            CoreError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            CoreError::AccessDenied(_)
            | CoreError::InvalidCredentials
            | CoreError::ShopSuspended(_)
            | CoreError::SubscriptionExpired(_) => ErrorKind::Unauthorized,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur before any side effect takes place.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate barcode or username).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
