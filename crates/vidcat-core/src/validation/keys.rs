//! Blob key rules.
//!
//! Keys are opaque object names chosen by the uploader. The catalog refuses the
//! same shapes the storage backends refuse, so a committed row never points at
//! a blob that cannot be deleted. Only a leading `/` and a `..` path segment
//! are rejected; `clip..v2.mp4` is an ordinary name.

/// Describe why `key` is not a usable storage key, or `None` if it is.
pub fn storage_key_problem(key: &str) -> Option<&'static str> {
    if key.trim().is_empty() {
        return Some("Storage key is empty");
    }
    if key.starts_with('/') {
        return Some("Storage key must not start with '/'");
    }
    if key.split(|c| c == '/' || c == '\\').any(|segment| segment == "..") {
        return Some("Storage key must not contain a '..' path segment");
    }
    None
}
