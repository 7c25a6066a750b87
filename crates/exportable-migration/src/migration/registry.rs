//! Explicit registry of migration definitions.
//!
//! The original system discovered migration classes by scanning source
//! files; here every definition is registered explicitly and the index
//! writer walks the registered list. This keeps discovery free of
//! load-order side effects and makes the set of available transforms a
//! plain value.

use std::sync::Arc;

use exportable_core::VersionKey;

/// A migration definition: version metadata plus the executable
/// transform for one step.
///
/// The transform itself is opaque to this crate; `apply` receives the
/// record's data in the `from_version` shape and must return it in the
/// `to_version` shape, or fail.
pub trait MigrationDefinition: Send + Sync + std::fmt::Debug {
    /// Returns the source version this definition migrates from.
    fn from_version(&self) -> VersionKey;

    /// Returns the target version this definition produces.
    fn to_version(&self) -> VersionKey;

    /// Returns the logical record type this definition applies to.
    fn type_id(&self) -> &str;

    /// Returns the stable reference under which index entries name
    /// this definition.
    fn transform_ref(&self) -> &str;

    /// Transforms one record's data to the `to_version` shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the transformation cannot be completed; the
    /// resolver aborts the chain and reports the failing entry.
    fn apply(&self, data: serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

/// The set of migration definitions compiled into the application.
///
/// `MigrationIndex::write` serializes this set; the resolver consults
/// it to turn an index entry's `transform_ref` back into an executable
/// transform.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    definitions: Vec<Arc<dyn MigrationDefinition>>,
}

impl MigrationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single definition.
    pub fn register(&mut self, definition: Arc<dyn MigrationDefinition>) {
        self.definitions.push(definition);
    }

    /// Registers multiple definitions at once.
    pub fn register_all(&mut self, definitions: Vec<Arc<dyn MigrationDefinition>>) {
        for definition in definitions {
            self.register(definition);
        }
    }

    /// Returns the registered definitions in registration order.
    pub fn definitions(&self) -> &[Arc<dyn MigrationDefinition>] {
        &self.definitions
    }

    /// Resolves a transform reference to its definition.
    pub fn transform(&self, transform_ref: &str) -> Option<&Arc<dyn MigrationDefinition>> {
        self.definitions
            .iter()
            .find(|d| d.transform_ref() == transform_ref)
    }

    /// Returns the number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if no definitions are registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A definition whose transform appends a marker to an "applied"
    /// array in the record data, or fails on demand.
    #[derive(Debug)]
    pub struct StubDefinition {
        pub from: VersionKey,
        pub to: VersionKey,
        pub type_id: String,
        pub transform_ref: String,
        pub fail: bool,
    }

    impl StubDefinition {
        pub fn new(type_id: &str, from: &str, to: &str) -> Self {
            Self {
                from: VersionKey::parse(from).unwrap(),
                to: VersionKey::parse(to).unwrap(),
                type_id: type_id.to_string(),
                transform_ref: format!("{}:{}->{}", type_id, from, to),
                fail: false,
            }
        }

        pub fn failing(type_id: &str, from: &str, to: &str) -> Self {
            Self {
                fail: true,
                ..Self::new(type_id, from, to)
            }
        }
    }

    impl MigrationDefinition for StubDefinition {
        fn from_version(&self) -> VersionKey {
            self.from.clone()
        }

        fn to_version(&self) -> VersionKey {
            self.to.clone()
        }

        fn type_id(&self) -> &str {
            &self.type_id
        }

        fn transform_ref(&self) -> &str {
            &self.transform_ref
        }

        fn apply(&self, mut data: serde_json::Value) -> anyhow::Result<serde_json::Value> {
            if self.fail {
                anyhow::bail!("stub transform failure");
            }
            let marker = serde_json::Value::String(self.transform_ref.clone());
            match data.get_mut("applied").and_then(|v| v.as_array_mut()) {
                Some(applied) => applied.push(marker),
                None => {
                    data["applied"] = serde_json::Value::Array(vec![marker]);
                }
            }
            Ok(data)
        }
    }
}
