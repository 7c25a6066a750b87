//! A single registered transformation between two schema versions.

use std::cmp::Ordering;

use exportable_core::{MigrationError, Result, VersionKey};

/// One migration step: `from` -> `to` for the record type `type_id`.
///
/// Entries are immutable once constructed; they are created by
/// deserializing a persisted index or directly in tests. The
/// `transform_ref` names the executable transform and is resolved
/// through the definition registry when the step is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationEntry {
    from: VersionKey,
    to: VersionKey,
    type_id: String,
    transform_ref: String,
}

impl MigrationEntry {
    /// Creates a new entry, enforcing that `from` precedes `to`.
    ///
    /// # Errors
    ///
    /// Returns `IncomparableVersions` if the two keys differ in arity,
    /// or `InvalidEntry` if `from >= to`.
    pub fn new(
        from: VersionKey,
        to: VersionKey,
        type_id: impl Into<String>,
        transform_ref: impl Into<String>,
    ) -> Result<Self> {
        let type_id = type_id.into();
        if from.compare(&to)? != Ordering::Less {
            return Err(MigrationError::invalid_entry(&type_id, &from, &to));
        }
        Ok(Self {
            from,
            to,
            type_id,
            transform_ref: transform_ref.into(),
        })
    }

    // Bypasses the `from < to` check. Only used to model a hand-edited
    // index in resolver tests; production entries go through `new`.
    #[cfg(test)]
    pub(crate) fn new_unchecked(
        from: VersionKey,
        to: VersionKey,
        type_id: impl Into<String>,
        transform_ref: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            type_id: type_id.into(),
            transform_ref: transform_ref.into(),
        }
    }

    /// Returns the origin version this entry migrates from.
    pub fn from_version(&self) -> &VersionKey {
        &self.from
    }

    /// Returns the destination version this entry migrates to.
    pub fn to_version(&self) -> &VersionKey {
        &self.to
    }

    /// Returns the logical record type this entry applies to.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Returns the reference naming the executable transform.
    pub fn transform_ref(&self) -> &str {
        &self.transform_ref
    }

    /// True iff this entry migrates `type_id` from exactly `version`.
    pub fn applies_to(&self, type_id: &str, version: &VersionKey) -> bool {
        self.type_id == type_id && self.from == *version
    }
}
