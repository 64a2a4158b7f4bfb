use serde::Serialize;
use vidcat_core::{AppError, ErrorMetadata};

/// JSON body printed when a command fails.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub code: &'static str,
    pub error: String,
    pub status: u16,
    pub recoverable: bool,
    /// True when metadata changed before the failure (only blob cleanup is pending).
    pub side_effects: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphan_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorReport {
    /// Build the report; sensitive details are omitted in production.
    pub fn from_error(err: &AppError, production: bool) -> Self {
        let details = if production && err.is_sensitive() {
            None
        } else {
            Some(err.detailed_message())
        };

        Self {
            code: err.error_code(),
            error: err.client_message(),
            status: err.http_status_code(),
            recoverable: err.is_recoverable(),
            side_effects: err.has_side_effects(),
            suggested_action: err.suggested_action(),
            orphan_keys: err.orphan_keys().to_vec(),
            details,
        }
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vidcat=info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidcat_core::StoreError;

    fn transaction_error() -> AppError {
        AppError::Transaction {
            message: "create transaction failed and was rolled back".to_string(),
            orphan_keys: vec!["covers/c1.jpg".to_string(), "videos/v1.mp4".to_string()],
            source: Some(StoreError::Backend("connection reset".to_string())),
        }
    }

    #[test]
    fn transaction_report_lists_orphans() {
        let report = ErrorReport::from_error(&transaction_error(), false);
        assert_eq!(report.code, "TRANSACTION_ERROR");
        assert_eq!(report.orphan_keys.len(), 2);
        assert!(!report.side_effects);
        assert!(report.details.unwrap().contains("connection reset"));
    }

    #[test]
    fn production_hides_sensitive_details() {
        let report = ErrorReport::from_error(&transaction_error(), true);
        assert!(report.details.is_none());
        // Orphans are still needed to clean up.
        assert_eq!(report.orphan_keys.len(), 2);
    }

    #[test]
    fn compensation_report_flags_side_effects() {
        let err = AppError::Compensation {
            failed_keys: vec!["videos/old.mp4".to_string()],
        };
        let json = serde_json::to_value(ErrorReport::from_error(&err, true)).unwrap();
        assert_eq!(json["code"], "COMPENSATION_ERROR");
        assert_eq!(json["sideEffects"], true);
        assert!(json.get("orphanKeys").is_none());
    }
}
