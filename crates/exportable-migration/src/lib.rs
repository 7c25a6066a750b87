//! Migration index and resolver for versioned exportable records.
//!
//! The record storage layer persists each record with a schema version
//! tag. When a loaded record is older than the current schema, this
//! crate resolves and applies the chain of registered transformations
//! that brings it up to date:
//!
//! - [`storage`] — locked, atomic file access for the persisted index
//! - [`dto`] — the fixed wire format of index entries
//! - [`migration`] — the index, the definition registry and the resolver

pub mod dto;
pub mod migration;
pub mod storage;

pub use crate::migration::entry::MigrationEntry;
pub use crate::migration::index::MigrationIndex;
pub use crate::migration::registry::{MigrationDefinition, MigrationRegistry};
pub use crate::migration::resolver::{MigrationResolver, Record};
