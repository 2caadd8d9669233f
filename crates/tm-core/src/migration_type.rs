//! Migration types and the registry that resolves them by name.
//!
//! The set of types is open: the core ones are associated constants on
//! [`MigrationType`], and extensions register additional types on a
//! [`MigrationTypeRegistry`]. Ledger bindings store the type name and resolve
//! it back through the registry when reading rows.

use crate::error::{CoreError, CoreResult};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Capability flags carried by a migration type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MigrationTypeFlags {
    /// Bookkeeping row that does not correspond to a migration script
    pub synthetic: bool,
    /// Reverts a previously applied versioned migration
    pub undo: bool,
    /// Marks the baseline below which migrations are not applied
    pub baseline: bool,
}

/// A named migration type with its capability flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MigrationType {
    name: Cow<'static, str>,
    flags: MigrationTypeFlags,
}

impl MigrationType {
    /// Schema creation marker
    pub const SCHEMA: MigrationType = MigrationType::core("SCHEMA", true, false, false);
    /// Baseline marker
    pub const BASELINE: MigrationType = MigrationType::core("BASELINE", true, false, true);
    /// Marks an applied migration as deleted
    pub const DELETE: MigrationType = MigrationType::core("DELETE", true, false, false);
    /// SQL migration
    pub const SQL: MigrationType = MigrationType::core("SQL", false, false, false);
    /// SQL baseline migration
    pub const SQL_BASELINE: MigrationType = MigrationType::core("SQL_BASELINE", false, false, true);
    /// Script migration
    pub const SCRIPT: MigrationType = MigrationType::core("SCRIPT", false, false, false);
    /// Script baseline migration
    pub const SCRIPT_BASELINE: MigrationType =
        MigrationType::core("SCRIPT_BASELINE", false, false, true);
    /// Migration implemented by an extension
    pub const CUSTOM: MigrationType = MigrationType::core("CUSTOM", false, false, false);
    /// Undo SQL migration
    pub const UNDO_SQL: MigrationType = MigrationType::core("UNDO_SQL", false, true, false);
    /// Undo script migration
    pub const UNDO_SCRIPT: MigrationType = MigrationType::core("UNDO_SCRIPT", false, true, false);

    const fn core(name: &'static str, synthetic: bool, undo: bool, baseline: bool) -> Self {
        Self {
            name: Cow::Borrowed(name),
            flags: MigrationTypeFlags {
                synthetic,
                undo,
                baseline,
            },
        }
    }

    /// Define a new type, e.g. for registration by an extension.
    pub fn new(name: impl Into<String>, flags: MigrationTypeFlags) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            flags,
        }
    }

    /// The stored name of this type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capability flags of this type.
    pub fn flags(&self) -> MigrationTypeFlags {
        self.flags
    }

    /// Whether rows of this type are bookkeeping only.
    pub fn is_synthetic(&self) -> bool {
        self.flags.synthetic
    }

    /// Whether rows of this type undo a versioned migration.
    pub fn is_undo(&self) -> bool {
        self.flags.undo
    }

    /// Whether rows of this type act as a baseline.
    pub fn is_baseline(&self) -> bool {
        self.flags.baseline
    }
}

impl fmt::Display for MigrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The types every registry starts with.
pub static CORE_MIGRATION_TYPES: &[MigrationType] = &[
    MigrationType::SCHEMA,
    MigrationType::BASELINE,
    MigrationType::DELETE,
    MigrationType::SQL,
    MigrationType::SQL_BASELINE,
    MigrationType::SCRIPT,
    MigrationType::SCRIPT_BASELINE,
    MigrationType::CUSTOM,
    MigrationType::UNDO_SQL,
    MigrationType::UNDO_SCRIPT,
];

/// Name-to-type lookup table.
#[derive(Debug, Clone)]
pub struct MigrationTypeRegistry {
    types: BTreeMap<String, MigrationType>,
}

impl MigrationTypeRegistry {
    /// A registry holding only the core types.
    pub fn with_core_types() -> Self {
        let types = CORE_MIGRATION_TYPES
            .iter()
            .map(|t| (t.name().to_string(), t.clone()))
            .collect();
        Self { types }
    }

    /// Add a type. Names are unique; re-registering a name is an error.
    pub fn register(&mut self, migration_type: MigrationType) -> CoreResult<()> {
        if self.types.contains_key(migration_type.name()) {
            return Err(CoreError::DuplicateMigrationType {
                name: migration_type.name().to_string(),
            });
        }
        self.types
            .insert(migration_type.name().to_string(), migration_type);
        Ok(())
    }

    /// Look up a type by its stored name.
    pub fn resolve(&self, name: &str) -> Option<&MigrationType> {
        self.types.get(name)
    }

    /// All registered type names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl Default for MigrationTypeRegistry {
    fn default() -> Self {
        Self::with_core_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_flags() {
        assert!(MigrationType::SCHEMA.is_synthetic());
        assert!(MigrationType::BASELINE.is_synthetic());
        assert!(MigrationType::BASELINE.is_baseline());
        assert!(!MigrationType::SQL.is_synthetic());
        assert!(MigrationType::SQL_BASELINE.is_baseline());
        assert!(!MigrationType::SQL_BASELINE.is_synthetic());
        assert!(MigrationType::UNDO_SQL.is_undo());
        assert!(!MigrationType::DELETE.is_undo());
    }

    #[test]
    fn test_resolve_core_type() {
        let registry = MigrationTypeRegistry::default();
        assert_eq!(registry.resolve("SCHEMA"), Some(&MigrationType::SCHEMA));
        assert_eq!(registry.resolve("sql"), None);
        assert_eq!(registry.names().count(), CORE_MIGRATION_TYPES.len());
    }

    #[test]
    fn test_register_extension_type() {
        let mut registry = MigrationTypeRegistry::with_core_types();
        let flags = MigrationTypeFlags {
            undo: true,
            ..Default::default()
        };
        registry
            .register(MigrationType::new("UNDO_CUSTOM", flags))
            .unwrap();

        let resolved = registry.resolve("UNDO_CUSTOM").unwrap();
        assert!(resolved.is_undo());
        assert!(!resolved.is_synthetic());
        assert_eq!(resolved.to_string(), "UNDO_CUSTOM");
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = MigrationTypeRegistry::with_core_types();
        let err = registry
            .register(MigrationType::new("SQL", MigrationTypeFlags::default()))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateMigrationType { .. }));
    }

    #[test]
    fn test_owned_and_borrowed_names_compare_equal() {
        let owned = MigrationType::new(
            "SCHEMA",
            MigrationTypeFlags {
                synthetic: true,
                ..Default::default()
            },
        );
        assert_eq!(owned, MigrationType::SCHEMA);
    }
}
