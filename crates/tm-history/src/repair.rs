//! Repair support: which failed rows to remove and what was removed.

use crate::applied::AppliedMigration;
use tm_core::MigrationVersion;

/// Selects migrations by version, or by description for unversioned ones.
///
/// Written the way migrations are named on disk: `_` separates version parts
/// (`2_1` matches version `2.1`) and words of a description (`add_users`
/// matches `add users`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPattern {
    pattern: String,
}

impl MigrationPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether a migration with this version and description is selected.
    pub fn matches(&self, version: Option<&MigrationVersion>, description: &str) -> bool {
        match version {
            Some(version) => MigrationVersion::parse(&self.pattern).is_ok_and(|p| &p == version),
            None => self.pattern.replace('_', " ") == description,
        }
    }
}

/// Whether a repair removes `migration` from the ledger.
///
/// Only failed rows are removed, and baseline rows never are. An empty
/// `filter` selects every failed row.
pub fn is_removable(migration: &AppliedMigration, filter: &[MigrationPattern]) -> bool {
    !migration.success
        && !migration.migration_type.is_baseline()
        && (filter.is_empty()
            || filter
                .iter()
                .any(|p| p.matches(migration.version.as_ref(), &migration.description)))
}

/// Outcome of a repair, filled in by the ledger.
#[derive(Debug, Clone, Default)]
pub struct RepairResult {
    /// Failed rows that were deleted from the ledger
    pub migrations_removed: Vec<AppliedMigration>,
    pub warnings: Vec<String>,
}

impl RepairResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Record rows a ledger removed. Every pattern in `filter` that selected
    /// none of them gets a warning. Returns whether anything was removed.
    pub fn record_removed(
        &mut self,
        removed: Vec<AppliedMigration>,
        filter: &[MigrationPattern],
    ) -> bool {
        for pattern in filter {
            let used = removed
                .iter()
                .any(|m| pattern.matches(m.version.as_ref(), &m.description));
            if !used {
                self.add_warning(format!(
                    "No failed migration matches '{}'; nothing removed for it",
                    pattern.as_str()
                ));
            }
        }
        let any_removed = !removed.is_empty();
        self.migrations_removed.extend(removed);
        any_removed
    }
}
