//! Error types for the migration subsystem.

use thiserror::Error;

/// A shared error type for all migration index and resolver operations.
///
/// This provides typed, structured error variants with automatic
/// conversion from common error types via the `From` trait. All
/// index-level errors abort the operation and surface synchronously;
/// `IndexLocked` is the only variant a caller may sensibly retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrationError {
    /// The index file is absent. An index must be provisioned
    /// out-of-band; there is nothing to retry.
    #[error("Migration index missing: {path}")]
    IndexMissing { path: String },

    /// The index file exists but could not be deserialized.
    #[error("Migration index corrupt: {path}: {message}")]
    IndexCorrupt { path: String, message: String },

    /// Two version keys with different segment counts were compared.
    #[error("Incomparable versions: '{left}' and '{right}' differ in segment count")]
    IncomparableVersions { left: String, right: String },

    /// A version string failed to parse.
    #[error("Malformed version string: '{input}'")]
    MalformedVersion { input: String },

    /// Two index entries start at the same version for the same type.
    #[error("Ambiguous migration: multiple entries from version {from} for type '{type_id}'")]
    AmbiguousMigration { type_id: String, from: String },

    /// The index lock was not acquired within the bounded wait.
    #[error("Migration index locked: {path}")]
    IndexLocked { path: String },

    /// An entry whose destination does not advance past its origin.
    #[error("Invalid migration entry for type '{type_id}': {from} -> {to}")]
    InvalidEntry {
        type_id: String,
        from: String,
        to: String,
    },

    /// A version repeated within a single resolution chain.
    #[error("Migration cycle detected for type '{type_id}' at version {version}")]
    MigrationCycle { type_id: String, version: String },

    /// An individual transform raised an error. Steps applied before
    /// this one are retained; each step leaves the record
    /// self-consistent.
    #[error("Transform failed for type '{type_id}' ({from} -> {to}): {cause}")]
    TransformFailed {
        type_id: String,
        from: String,
        to: String,
        cause: String,
    },

    /// Resolution was cancelled between steps.
    #[error("Migration resolution cancelled")]
    Cancelled,

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },
}

impl MigrationError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an IndexMissing error
    pub fn index_missing(path: impl std::fmt::Display) -> Self {
        Self::IndexMissing {
            path: path.to_string(),
        }
    }

    /// Creates an IndexCorrupt error
    pub fn index_corrupt(path: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::IndexCorrupt {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Creates an IncomparableVersions error
    pub fn incomparable(left: impl std::fmt::Display, right: impl std::fmt::Display) -> Self {
        Self::IncomparableVersions {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// Creates a MalformedVersion error
    pub fn malformed_version(input: impl Into<String>) -> Self {
        Self::MalformedVersion {
            input: input.into(),
        }
    }

    /// Creates an AmbiguousMigration error
    pub fn ambiguous(type_id: impl Into<String>, from: impl std::fmt::Display) -> Self {
        Self::AmbiguousMigration {
            type_id: type_id.into(),
            from: from.to_string(),
        }
    }

    /// Creates an IndexLocked error
    pub fn index_locked(path: impl std::fmt::Display) -> Self {
        Self::IndexLocked {
            path: path.to_string(),
        }
    }

    /// Creates an InvalidEntry error
    pub fn invalid_entry(
        type_id: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidEntry {
            type_id: type_id.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates a MigrationCycle error
    pub fn cycle(type_id: impl Into<String>, version: impl std::fmt::Display) -> Self {
        Self::MigrationCycle {
            type_id: type_id.into(),
            version: version.to_string(),
        }
    }

    /// Creates a TransformFailed error
    pub fn transform_failed(
        type_id: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
        cause: impl Into<String>,
    ) -> Self {
        Self::TransformFailed {
            type_id: type_id.into(),
            from: from.to_string(),
            to: to.to_string(),
            cause: cause.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an IndexMissing error
    pub fn is_index_missing(&self) -> bool {
        matches!(self, Self::IndexMissing { .. })
    }

    /// Check if this is a TransformFailed error
    pub fn is_transform_failed(&self) -> bool {
        matches!(self, Self::TransformFailed { .. })
    }

    /// Check if the caller may retry the failed operation.
    ///
    /// Only lock contention is retryable; every other variant is a
    /// terminal integrity or resolution failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IndexLocked { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

/// A type alias for `Result<T, MigrationError>`.
pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lock_contention_is_retryable() {
        assert!(MigrationError::index_locked("/tmp/index.json").is_retryable());
        assert!(!MigrationError::index_missing("/tmp/index.json").is_retryable());
        assert!(!MigrationError::Cancelled.is_retryable());
    }

    #[test]
    fn transform_failed_names_the_entry() {
        let err = MigrationError::transform_failed("Slide", "1.0.0", "1.1.0", "boom");
        let message = err.to_string();
        assert!(message.contains("Slide"));
        assert!(message.contains("1.0.0 -> 1.1.0"));
        assert!(message.contains("boom"));
    }
}
