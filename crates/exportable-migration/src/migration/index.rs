//! The persisted migration index.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use exportable_core::{MigrationError, Result, VersionKey};

use crate::dto::IndexEntryDto;
use crate::migration::entry::MigrationEntry;
use crate::migration::registry::MigrationRegistry;
use crate::storage;

/// An ordered collection of migration entries, loaded wholesale from a
/// persisted index file.
///
/// The in-memory sequence is always sorted ascending by origin version
/// and validated for uniqueness of `(type_id, from)`. An index is never
/// mutated entry-by-entry: `load` constructs a fresh value, and `write`
/// serializes the registry from scratch. A loaded index is read-only
/// and safe to share across threads without synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationIndex {
    entries: Vec<MigrationEntry>,
}

impl MigrationIndex {
    /// Builds an index from entries, validating and sorting them.
    ///
    /// # Errors
    ///
    /// Returns `IncomparableVersions` if the entries' version keys do
    /// not all share one arity, or `AmbiguousMigration` if two entries
    /// share `(type_id, from)`.
    pub fn from_entries(mut entries: Vec<MigrationEntry>) -> Result<Self> {
        check_uniform_arity(&entries)?;

        // Arity is uniform at this point, so segment-wise slice order
        // is exactly the dotted-version order; the sort is stable and
        // ties keep their original file order.
        entries.sort_by(|a, b| a.from_version().segments().cmp(b.from_version().segments()));

        check_unambiguous(&entries)?;

        Ok(Self { entries })
    }

    /// Loads the index from `path` with the default lock bound.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_timeout(path, storage::DEFAULT_LOCK_TIMEOUT)
    }

    /// Loads the index from `path`.
    ///
    /// Takes a shared lock for the duration of the read only; parsing,
    /// sorting and validation happen after the lock is released.
    ///
    /// # Errors
    ///
    /// Returns `IndexMissing` if the file is absent, `IndexLocked` if
    /// the read lock is not acquired within `timeout`, `IndexCorrupt`
    /// if deserialization fails, `MalformedVersion` for unparsable
    /// version strings, and the `from_entries` validation errors. A
    /// partially sorted index is never exposed.
    pub fn load_with_timeout(path: &Path, timeout: Duration) -> Result<Self> {
        let bytes = storage::read_locked_timeout(path, timeout)?;

        let dtos: Vec<IndexEntryDto> = serde_json::from_slice(&bytes)
            .map_err(|e| MigrationError::index_corrupt(path.display(), e.to_string()))?;

        let mut entries = Vec::with_capacity(dtos.len());
        for dto in dtos {
            entries.push(dto.into_entry()?);
        }

        let index = Self::from_entries(entries)?;
        tracing::debug!(
            "Loaded migration index from {} ({} entries)",
            path.display(),
            index.len()
        );
        Ok(index)
    }

    /// Writes a fresh index file from the registered definitions with
    /// the default lock bound.
    pub fn write(path: &Path, registry: &MigrationRegistry) -> Result<usize> {
        Self::write_with_timeout(path, registry, storage::DEFAULT_LOCK_TIMEOUT)
    }

    /// Writes a fresh index file from the registered definitions.
    ///
    /// The entry list is serialized in registration order; sort order
    /// is a load-time concern. Persisting happens under an exclusive
    /// lock with an atomic rename, so a concurrent reader never
    /// observes a half-written file. Returns the number of entries
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `IndexLocked` if the write lock is not acquired within
    /// `timeout`, or `Io` on filesystem failures.
    pub fn write_with_timeout(
        path: &Path,
        registry: &MigrationRegistry,
        timeout: Duration,
    ) -> Result<usize> {
        if registry.is_empty() {
            tracing::warn!(
                "Writing an empty migration index to {}",
                path.display()
            );
        }

        let dtos: Vec<IndexEntryDto> = registry
            .definitions()
            .iter()
            .map(|d| IndexEntryDto::from_definition(d.as_ref()))
            .collect();

        let bytes = serde_json::to_vec_pretty(&dtos)
            .map_err(|e| MigrationError::io(e.to_string()))?;
        storage::write_locked_timeout(path, &bytes, timeout)?;

        tracing::info!(
            "Wrote migration index to {} ({} entries)",
            path.display(),
            dtos.len()
        );
        Ok(dtos.len())
    }

    /// Returns the entry migrating `type_id` from exactly `from`, if any.
    ///
    /// Scans in ascending `from` order; by the uniqueness invariant at
    /// most one entry can match. `None` means the record is already at
    /// its latest known version.
    pub fn find(&self, type_id: &str, from: &VersionKey) -> Option<&MigrationEntry> {
        self.entries.iter().find(|e| e.applies_to(type_id, from))
    }

    /// Returns the entries in ascending `from` order.
    pub fn entries(&self) -> &[MigrationEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_uniform_arity(entries: &[MigrationEntry]) -> Result<()> {
    let Some(first) = entries.first() else {
        return Ok(());
    };
    let reference = first.from_version();
    for entry in entries {
        reference.compare(entry.from_version())?;
        reference.compare(entry.to_version())?;
    }
    Ok(())
}

fn check_unambiguous(entries: &[MigrationEntry]) -> Result<()> {
    let mut seen: HashSet<(&str, &[u64])> = HashSet::new();
    for entry in entries {
        if !seen.insert((entry.type_id(), entry.from_version().segments())) {
            return Err(MigrationError::ambiguous(
                entry.type_id(),
                entry.from_version(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::registry::test_support::StubDefinition;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn version(s: &str) -> VersionKey {
        VersionKey::parse(s).unwrap()
    }

    fn entry(type_id: &str, from: &str, to: &str) -> MigrationEntry {
        MigrationEntry::new(version(from), version(to), type_id, format!("{}@{}", type_id, from))
            .unwrap()
    }

    fn slide_registry() -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        registry.register_all(vec![
            Arc::new(StubDefinition::new("Slide", "2.0.0", "2.1.0")),
            Arc::new(StubDefinition::new("Slide", "1.0.0", "1.2.0")),
            Arc::new(StubDefinition::new("Slide", "1.2.0", "2.0.0")),
        ]);
        registry
    }

    #[test]
    fn write_then_load_round_trips_the_entry_set() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migration_index.json");
        let registry = slide_registry();

        let written = MigrationIndex::write(&path, &registry).unwrap();
        assert_eq!(written, 3);

        let index = MigrationIndex::load(&path).unwrap();
        assert_eq!(index.len(), 3);

        let mut expected: Vec<(String, String, String)> = registry
            .definitions()
            .iter()
            .map(|d| {
                (
                    d.type_id().to_string(),
                    d.from_version().to_string(),
                    d.to_version().to_string(),
                )
            })
            .collect();
        let mut loaded: Vec<(String, String, String)> = index
            .entries()
            .iter()
            .map(|e| {
                (
                    e.type_id().to_string(),
                    e.from_version().to_string(),
                    e.to_version().to_string(),
                )
            })
            .collect();
        expected.sort();
        loaded.sort();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn load_sorts_ascending_by_origin_version() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migration_index.json");

        // Written in registration order, deliberately unsorted
        MigrationIndex::write(&path, &slide_registry()).unwrap();

        let index = MigrationIndex::load(&path).unwrap();
        let origins: Vec<String> = index
            .entries()
            .iter()
            .map(|e| e.from_version().to_string())
            .collect();
        assert_eq!(origins, vec!["1.0.0", "1.2.0", "2.0.0"]);
    }

    #[test]
    fn rewriting_an_unchanged_registry_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migration_index.json");
        let registry = slide_registry();

        MigrationIndex::write(&path, &registry).unwrap();
        let first = fs::read(&path).unwrap();
        MigrationIndex::write(&path, &registry).unwrap();
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_origin_for_one_type_is_ambiguous() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migration_index.json");
        fs::write(
            &path,
            r#"[
                {"from": "1.0.0", "to": "1.1.0", "fqcn": "T", "data_fqcn": "a"},
                {"from": "1.0.0", "to": "1.2.0", "fqcn": "T", "data_fqcn": "b"}
            ]"#,
        )
        .unwrap();

        let err = MigrationIndex::load(&path).unwrap_err();
        assert!(matches!(err, MigrationError::AmbiguousMigration { .. }));
    }

    #[test]
    fn same_origin_for_different_types_is_fine() {
        let index = MigrationIndex::from_entries(vec![
            entry("Slide", "1.0.0", "1.1.0"),
            entry("Queue", "1.0.0", "1.1.0"),
        ])
        .unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn mixed_arity_aborts_the_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migration_index.json");
        fs::write(
            &path,
            r#"[
                {"from": "1.0.0", "to": "1.1.0", "fqcn": "T", "data_fqcn": "a"},
                {"from": "1.2", "to": "1.3", "fqcn": "T", "data_fqcn": "b"}
            ]"#,
        )
        .unwrap();

        let err = MigrationIndex::load(&path).unwrap_err();
        assert!(matches!(err, MigrationError::IncomparableVersions { .. }));
    }

    #[test]
    fn missing_index_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.json");

        let err = MigrationIndex::load(&path).unwrap_err();
        assert!(err.is_index_missing());
    }

    #[test]
    fn corrupt_index_names_the_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migration_index.json");
        fs::write(&path, b"{not json").unwrap();

        match MigrationIndex::load(&path).unwrap_err() {
            MigrationError::IndexCorrupt { path: reported, .. } => {
                assert!(reported.ends_with("migration_index.json"));
            }
            other => panic!("expected IndexCorrupt, got {:?}", other),
        }
    }

    #[test]
    fn missing_fields_are_corrupt_not_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migration_index.json");
        fs::write(
            &path,
            r#"[{"from": "1.0.0", "fqcn": "T", "data_fqcn": "a"}]"#,
        )
        .unwrap();

        let err = MigrationIndex::load(&path).unwrap_err();
        assert!(matches!(err, MigrationError::IndexCorrupt { .. }));
    }

    #[test]
    fn find_returns_the_single_applicable_entry() {
        let index = MigrationIndex::from_entries(vec![
            entry("Slide", "1.0.0", "1.1.0"),
            entry("Slide", "1.1.0", "2.0.0"),
            entry("Queue", "1.0.0", "1.1.0"),
        ])
        .unwrap();

        let found = index.find("Slide", &version("1.1.0")).unwrap();
        assert_eq!(found.to_version(), &version("2.0.0"));

        assert!(index.find("Slide", &version("2.0.0")).is_none());
        assert!(index.find("Unknown", &version("1.0.0")).is_none());
    }

    #[test]
    fn empty_index_loads_and_finds_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migration_index.json");
        fs::write(&path, b"[]").unwrap();

        let index = MigrationIndex::load(&path).unwrap();
        assert!(index.is_empty());
        assert!(index.find("Slide", &version("1.0.0")).is_none());
    }
}
