//! vidcat database layer
//!
//! Transaction seam, PostgreSQL repositories and pool setup.

pub mod db;
pub mod setup;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use db::*;
pub use setup::setup_database;
