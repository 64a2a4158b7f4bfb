//! Error types module
//!
//! All lifecycle failures are unified under [`AppError`]. The variants mirror the
//! consistency outcomes a caller has to tell apart: nothing happened
//! (`Validation`, `Conflict`, `NotFound`, `Transaction`) versus metadata committed
//! with blob cleanup still pending (`Compensation`).
//!
//! [`StoreError`] is the narrower error produced by relational store
//! implementations. The orchestrator classifies it into an `AppError`.
//!
//! The `Database` variant of `StoreError` and `From<sqlx::Error>` are gated behind
//! the `sqlx` feature.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like stray blobs
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code a front end should return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TRANSACTION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Errors raised by relational store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the statement.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    /// Non-sqlx backend failure (in-memory stores, injected faults).
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn unique_constraint(&self) -> Option<&str> {
        match self {
            StoreError::UniqueViolation { constraint } => Some(constraint),
            _ => None,
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for StoreError {
    fn from(err: SqlxError) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid input; no store was touched.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A uniqueness rule rejected the operation; the transaction was rolled back.
    /// `orphan_keys` lists the caller's other uploaded blobs that no committed
    /// row references. The conflicting key itself belongs to another video and
    /// is never listed.
    #[error("Conflict on {constraint}: {message}")]
    Conflict {
        constraint: String,
        message: String,
        orphan_keys: Vec<String>,
    },

    /// Relational failure during the atomic phase. Rollback was attempted and
    /// no blob was touched. `orphan_keys` lists blobs the caller uploaded that
    /// no committed row references.
    #[error("Transaction failed: {message}")]
    Transaction {
        message: String,
        orphan_keys: Vec<String>,
        #[source]
        source: Option<StoreError>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Blob deletion failed after the relational outcome was final.
    #[error("Blob cleanup incomplete for {} key(s)", failed_keys.len())]
    Compensation { failed_keys: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict { .. } => (
            409,
            "CONFLICT",
            false,
            Some("Upload the file under a new key and discard any listed orphan keys"),
            false,
            LogLevel::Debug,
        ),
        AppError::Transaction { .. } => (
            500,
            "TRANSACTION_ERROR",
            true,
            Some("Discard uploaded files, then retry the whole operation"),
            true,
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the video ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Compensation { .. } => (
            207,
            "COMPENSATION_ERROR",
            true,
            Some("Retry blob cleanup only; metadata is already committed"),
            false,
            LogLevel::Warn,
        ),
        AppError::Config(_) => (
            500,
            "CONFIG_ERROR",
            false,
            Some("Check service configuration"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::Conflict { .. } => "Conflict",
            AppError::Transaction { .. } => "Transaction",
            AppError::NotFound(_) => "NotFound",
            AppError::Compensation { .. } => "Compensation",
            AppError::Config(_) => "Config",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// True when the relational store was changed before the error surfaced.
    ///
    /// Only a compensation failure happens after commit. Every other variant
    /// means the operation left metadata untouched and can be retried as a whole.
    pub fn has_side_effects(&self) -> bool {
        matches!(self, AppError::Compensation { .. })
    }

    /// Blob keys the caller should hand to the orphan discard operation.
    pub fn orphan_keys(&self) -> &[String] {
        match self {
            AppError::Transaction { orphan_keys, .. } | AppError::Conflict { orphan_keys, .. } => {
                orphan_keys
            }
            _ => &[],
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::Conflict { ref message, .. } => message.clone(),
            AppError::Transaction { .. } => {
                "Database transaction failed and was rolled back".to_string()
            }
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Compensation { failed_keys } => format!(
                "Metadata saved, but {} file(s) could not be removed from storage",
                failed_keys.len()
            ),
            AppError::Config(_) => "Service misconfigured".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
