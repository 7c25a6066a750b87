//! Core types for the exportable record migration system.
//!
//! This crate holds the domain vocabulary shared by the index and
//! resolver layers: dotted version keys with checked comparison, and
//! the shared error type for every migration operation.

pub mod error;
pub mod version;

// Re-export common types
pub use error::{MigrationError, Result};
pub use version::VersionKey;
