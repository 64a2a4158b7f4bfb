//! Input validation helpers shared by the lifecycle requests.

pub mod keys;
pub mod tags;

pub use keys::storage_key_problem;
pub use tags::normalize_tag_names;

use validator::ValidationError;

/// Reject empty or whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Require a usable storage key.
pub fn storage_key(value: &str) -> Result<(), ValidationError> {
    if let Some(problem) = storage_key_problem(value) {
        let mut err = ValidationError::new("storage_key");
        err.message = Some(problem.into());
        return Err(err);
    }
    Ok(())
}

/// Like [`storage_key`], but a blank value means "no replacement" and passes.
pub fn replacement_key(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    storage_key(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_blank_rejects_whitespace() {
        assert!(not_blank("clip").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank("  \t").is_err());
    }

    #[test]
    fn replacement_key_allows_blank_but_not_traversal() {
        assert!(replacement_key("").is_ok());
        assert!(replacement_key("videos/v2.mp4").is_ok());
        assert!(replacement_key("../v2.mp4").is_err());
        assert!(storage_key("").is_err());
    }
}
