//! Wire-format DTOs for the persisted migration index.
//!
//! The persisted shape is decoupled from the domain types: versions stay
//! plain strings on disk and are parsed into [`VersionKey`]s when an
//! index is loaded.

use serde::{Deserialize, Serialize};

use exportable_core::{Result, VersionKey};

use crate::migration::entry::MigrationEntry;
use crate::migration::registry::MigrationDefinition;

/// One serialized index entry.
///
/// Field names are fixed for compatibility with existing index files:
/// `fqcn` carries the record type identifier and `data_fqcn` the
/// transform reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntryDto {
    pub from: String,
    pub to: String,
    pub fqcn: String,
    pub data_fqcn: String,
}

impl IndexEntryDto {
    /// Parses this DTO into a domain entry.
    ///
    /// # Errors
    ///
    /// Returns `MalformedVersion` if either version string fails to
    /// parse, `IncomparableVersions` if `from` and `to` differ in
    /// arity, or `InvalidEntry` if `from` does not precede `to`.
    pub fn into_entry(self) -> Result<MigrationEntry> {
        let from = VersionKey::parse(&self.from)?;
        let to = VersionKey::parse(&self.to)?;
        MigrationEntry::new(from, to, self.fqcn, self.data_fqcn)
    }

    /// Builds the persisted shape of a registered definition.
    pub fn from_definition(definition: &dyn MigrationDefinition) -> Self {
        Self {
            from: definition.from_version().to_string(),
            to: definition.to_version().to_string(),
            fqcn: definition.type_id().to_string(),
            data_fqcn: definition.transform_ref().to_string(),
        }
    }
}

impl From<&MigrationEntry> for IndexEntryDto {
    fn from(entry: &MigrationEntry) -> Self {
        Self {
            from: entry.from_version().to_string(),
            to: entry.to_version().to_string(),
            fqcn: entry.type_id().to_string(),
            data_fqcn: entry.transform_ref().to_string(),
        }
    }
}
