use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A blob key whose deletion failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDeletion {
    pub key: String,
    pub error: String,
}

/// Per-key outcome of a compensation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationReport {
    pub deleted: Vec<String>,
    pub failed: Vec<FailedDeletion>,
}

impl CompensationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_keys(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.key.clone()).collect()
    }

    /// Deleted keys, or a `Compensation` error naming the keys still present.
    pub fn into_result(self) -> Result<Vec<String>, AppError> {
        if self.failed.is_empty() {
            Ok(self.deleted)
        } else {
            Err(AppError::Compensation {
                failed_keys: self.failed_keys(),
            })
        }
    }
}
