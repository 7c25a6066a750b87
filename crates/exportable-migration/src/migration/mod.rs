//! Schema migration index and resolver.
//!
//! Records are persisted with a schema version tag. This module records
//! the available transformations between consecutive schema versions
//! and resolves, for a stale record, the chain of transforms that
//! brings it current:
//!
//! ```text
//!   MigrationRegistry ──write()──> index file ──load()──> MigrationIndex
//!                                                              │
//!                                        find(type_id, from) ──┘
//!                                                              │
//!   Record ──────────── MigrationResolver::resolve ────────────┘
//! ```
//!
//! The registry is the explicit list of migration definitions compiled
//! into the application; the index is its persisted, lookup-oriented
//! form. `load()` always re-sorts and re-validates, so the written file
//! is not required to be pre-sorted.

pub mod entry;
pub mod index;
pub mod registry;
pub mod resolver;

// Public API
pub use entry::MigrationEntry;
pub use index::MigrationIndex;
pub use registry::{MigrationDefinition, MigrationRegistry};
pub use resolver::{MigrationResolver, Record};
