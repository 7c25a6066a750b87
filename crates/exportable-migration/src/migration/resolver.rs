//! Full-chain migration resolution for stale records.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use exportable_core::{MigrationError, Result, VersionKey};

use crate::migration::entry::MigrationEntry;
use crate::migration::index::MigrationIndex;
use crate::migration::registry::MigrationRegistry;

/// A persisted record handed in by the storage layer.
///
/// Ownership stays with the caller; the resolver updates `version` and
/// `data` in place, one committed step at a time, so the two are never
/// mutually inconsistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_id: String,
    pub version: VersionKey,
    pub data: serde_json::Value,
}

/// Composes repeated index lookups into a full upgrade chain.
///
/// Operates purely in memory over an already-loaded index and performs
/// no locking; resolvers may run concurrently over distinct records
/// sharing one read-only index.
pub struct MigrationResolver<'a> {
    index: &'a MigrationIndex,
    registry: &'a MigrationRegistry,
}

impl<'a> MigrationResolver<'a> {
    /// Creates a resolver over a loaded index and the definition
    /// registry used to execute transforms.
    pub fn new(index: &'a MigrationIndex, registry: &'a MigrationRegistry) -> Self {
        Self { index, registry }
    }

    /// Brings `record` up to the latest known version for its type.
    ///
    /// Returns the number of transforms applied; zero means the record
    /// was already current. On failure the record is left at the last
    /// successfully reached version with matching data, which is
    /// self-consistent and safe to persist.
    pub fn resolve(&self, record: &mut Record) -> Result<usize> {
        static NEVER_CANCELLED: AtomicBool = AtomicBool::new(false);
        self.resolve_with_cancel(record, &NEVER_CANCELLED)
    }

    /// Like [`resolve`](Self::resolve), but checks `cancel` between
    /// steps (never mid-transform). A cancelled resolution fails with
    /// `Cancelled` and leaves the record at the last completed step.
    pub fn resolve_with_cancel(&self, record: &mut Record, cancel: &AtomicBool) -> Result<usize> {
        let mut visited: HashSet<VersionKey> = HashSet::new();
        let mut steps = 0usize;

        loop {
            if cancel.load(AtomicOrdering::Relaxed) {
                tracing::info!(
                    "Migration of '{}' cancelled at version {} after {} steps",
                    record.type_id,
                    record.version,
                    steps
                );
                return Err(MigrationError::Cancelled);
            }

            // A well-formed index cannot loop, but a hand-edited one
            // could; refuse to revisit a version.
            if !visited.insert(record.version.clone()) {
                return Err(MigrationError::cycle(&record.type_id, &record.version));
            }

            let Some(entry) = self.index.find(&record.type_id, &record.version) else {
                if steps == 0 {
                    tracing::debug!(
                        "Record '{}' is already at its latest version ({})",
                        record.type_id,
                        record.version
                    );
                } else {
                    tracing::info!(
                        "Migrated '{}' to version {} in {} steps",
                        record.type_id,
                        record.version,
                        steps
                    );
                }
                return Ok(steps);
            };

            self.apply_step(record, entry)?;
            steps += 1;
        }
    }

    /// Applies one transform all-or-nothing: `data` and `version` are
    /// committed together only after the transform succeeds.
    fn apply_step(&self, record: &mut Record, entry: &MigrationEntry) -> Result<()> {
        let definition = self.registry.transform(entry.transform_ref()).ok_or_else(|| {
            MigrationError::transform_failed(
                entry.type_id(),
                entry.from_version(),
                entry.to_version(),
                format!("transform '{}' is not registered", entry.transform_ref()),
            )
        })?;

        tracing::info!(
            "Migration step for '{}': {} -> {} ({})",
            entry.type_id(),
            entry.from_version(),
            entry.to_version(),
            entry.transform_ref()
        );

        let upgraded = definition.apply(record.data.clone()).map_err(|e| {
            MigrationError::transform_failed(
                entry.type_id(),
                entry.from_version(),
                entry.to_version(),
                e.to_string(),
            )
        })?;

        record.data = upgraded;
        record.version = entry.to_version().clone();
        Ok(())
    }
}
