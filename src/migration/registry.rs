//! Migration registry
//!
//! An owned map from artifact identity (`m{filename stem}`) to its implementation. Applications
//! build one at startup, usually through the module emitted by
//! [`write_registry_module`](crate::migration::build::write_registry_module), and hand it to the
//! manager.

use crate::migration::file::{identity_of, MigrationFile};
use crate::migration::{Migration, MigrationError};
use std::collections::BTreeMap;

struct Entry {
    filename: String,
    migration: Box<dyn Migration>,
}

#[derive(Default)]
pub struct MigrationRegistry {
    entries: BTreeMap<String, Entry>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the implementation of the artifact named `filename`
    ///
    /// # Errors
    ///
    /// `MigrationError::InvalidFormat` if `filename` does not follow the naming convention and
    /// `MigrationError::AlreadyRegistered` if the same artifact was registered before.
    pub fn register(
        &mut self,
        filename: &str,
        migration: impl Migration + 'static,
    ) -> Result<(), MigrationError> {
        let file = MigrationFile::parse_filename(filename)?;
        let identity = file.identity();
        if self.entries.contains_key(&identity) {
            return Err(MigrationError::AlreadyRegistered(filename.to_string()));
        }
        self.entries.insert(
            identity,
            Entry {
                filename: file.filename,
                migration: Box::new(migration),
            },
        );
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(
        mut self,
        filename: &str,
        migration: impl Migration + 'static,
    ) -> Result<Self, MigrationError> {
        self.register(filename, migration)?;
        Ok(self)
    }

    /// Look up an artifact by its filename
    pub fn get(&self, filename: &str) -> Option<&dyn Migration> {
        self.entries
            .get(&identity_of(filename))
            .map(|e| e.migration.as_ref())
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(&identity_of(filename))
    }

    /// Registered filenames in application order
    pub fn filenames(&self) -> Vec<String> {
        // identities share the filename's ordering
        self.entries.values().map(|e| e.filename.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::executor::StrataError;
    use crate::schema::SchemaGateway;

    struct Noop;

    impl Migration for Noop {
        fn up(&self, _schema: &SchemaGateway<'_>) -> Result<(), StrataError> {
            Ok(())
        }

        fn down(&self, _schema: &SchemaGateway<'_>) -> Result<(), StrataError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = MigrationRegistry::new()
            .with("20240102000000_second.rs", Noop)
            .unwrap()
            .with("20240101000000_first.rs", Noop)
            .unwrap();

        assert_eq!(
            registry.filenames(),
            vec!["20240101000000_first.rs", "20240102000000_second.rs"]
        );
        assert!(registry.get("20240101000000_first.rs").is_some());
        assert!(!registry.contains("20240103000000_third.rs"));
    }

    #[test]
    fn test_duplicate_and_invalid_registrations() {
        let mut registry = MigrationRegistry::new();
        registry.register("20240101000000_first.rs", Noop).unwrap();
        assert!(matches!(
            registry.register("20240101000000_first.rs", Noop),
            Err(MigrationError::AlreadyRegistered(_))
        ));
        assert!(matches!(
            registry.register("first.rs", Noop),
            Err(MigrationError::InvalidFormat(_))
        ));
    }
}
