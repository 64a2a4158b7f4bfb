//! Tag name normalization.
//!
//! Names are matched case-sensitively. Surrounding whitespace is stripped,
//! empty names are dropped and repeats collapse onto the first occurrence so the
//! reconciler never asks the store to upsert the same name twice in one statement.

use std::collections::HashSet;

pub fn normalize_tag_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .iter()
        .map(|name| name.as_ref().trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
