//! # Console Error Type
//!
//! The `{code, message}` object printed when a command fails.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Bazaar Console                         │
//! │                                                                         │
//! │  bazaar refund 7f3c...                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command handler                                                 │  │
//! │  │  anyhow::Result<serde_json::Value>                               │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  DbError / CoreError? ─── downcast ─── ApiError ────────────────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Anything else ─────────────────────── ApiError::internal ──────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr:                                                                │
//! │  { "code": "UNAUTHORIZED", "message": "Access denied: ..." }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use bazaar_core::{CoreError, ErrorKind};
use bazaar_db::DbError;
use serde::Serialize;

/// Error printed by the console when a command fails.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Cola (p-1): available 3, requested 5"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes, one per error category plus the infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    InsufficientStock,
    InvalidStateTransition,
    ConcurrencyConflict,
    Unauthorized,
    DatabaseError,
    ConfigError,
    Internal,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => ErrorCode::ValidationError,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::InsufficientStock => ErrorCode::InsufficientStock,
            ErrorKind::InvalidStateTransition => ErrorCode::InvalidStateTransition,
            ErrorKind::ConcurrencyConflict => ErrorCode::ConcurrencyConflict,
            ErrorKind::Unauthorized => ErrorCode::Unauthorized,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Classifies an error returned by a command handler.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(api) = err.downcast_ref::<ApiError>() {
            return api.clone();
        }
        if let Some(db) = err.downcast_ref::<DbError>() {
            return ApiError::from(db);
        }
        if let Some(core) = err.downcast_ref::<CoreError>() {
            return ApiError::from(core);
        }
        if let Some(config) = err.downcast_ref::<crate::config::ConfigError>() {
            return ApiError::new(ErrorCode::ConfigError, config.to_string());
        }
        ApiError::internal(format!("{:#}", err))
    }
}

/// Converts domain errors to API errors.
impl From<&CoreError> for ApiError {
    fn from(err: &CoreError) -> Self {
        ApiError::new(err.kind().into(), err.to_string())
    }
}

/// Converts database errors to API errors.
impl From<&DbError> for ApiError {
    fn from(err: &DbError) -> Self {
        if let Some(kind) = err.kind() {
            return ApiError::new(kind.into(), err.to_string());
        }

        match err {
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                ApiError::new(ErrorCode::DatabaseError, format!("Database migration failed: {}", e))
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{:?}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ApiError {}
