//! The schema history ledger contract.
//!
//! [`SchemaHistory`] is the minimal set of operations a storage binding must
//! provide. Behaviour derived from those operations (rank assignment,
//! markers, schema bookkeeping) lives in free functions so every binding
//! shares one implementation.

use crate::abbreviation;
use crate::applied::{AppliedMigration, MigrationRecord, ResolvedMigration};
use crate::error::{HistoryError, HistoryResult};
use crate::repair::{MigrationPattern, RepairResult};
use tm_core::MigrationType;
use tm_db::Schema;

/// Description of the marker row recording schemas created by Tidemark.
pub const SCHEMA_CREATION_DESCRIPTION: &str = "<< Schema Creation >>";

/// Ordered ledger of applied migrations, oldest first.
///
/// A ledger starts out not existing; [`create`](Self::create) brings it into
/// existence and is a no-op afterwards.
pub trait SchemaHistory {
    /// Whether the backing table exists.
    fn exists(&self) -> HistoryResult<bool>;

    /// Create the ledger, with a baseline row if `baseline` is set.
    fn create(&self, baseline: bool) -> HistoryResult<()>;

    /// Remove the ledger entirely.
    fn drop(&self) -> HistoryResult<()> {
        Err(HistoryError::Unsupported {
            operation: "Dropping the schema history table".to_string(),
        })
    }

    /// Run `unit_of_work` holding an exclusive lock on the ledger.
    ///
    /// The lock is released on every exit path and is not reentrant.
    fn lock<T, F>(&self, unit_of_work: F) -> HistoryResult<T>
    where
        F: FnOnce() -> HistoryResult<T>;

    /// Every row, oldest first. Empty if the ledger does not exist.
    fn all_applied_migrations(&self) -> HistoryResult<Vec<AppliedMigration>>;

    /// Forget any cached rows.
    fn clear_cache(&self) {}

    /// Realign a recorded row with the migration it was resolved to.
    fn update(
        &self,
        applied: &AppliedMigration,
        resolved: &ResolvedMigration,
    ) -> HistoryResult<()>;

    /// Record that `applied` was deleted, by appending a DELETE marker.
    fn delete(&self, applied: &AppliedMigration) -> HistoryResult<()>;

    /// Store one row at `installed_rank`. Callers go through
    /// [`add_applied_migration`], which assigns the rank and abbreviates.
    fn do_add_applied_migration(
        &self,
        installed_rank: i32,
        record: &MigrationRecord,
    ) -> HistoryResult<()>;

    /// Delete failed rows selected by `filter` (all failed rows if empty),
    /// noting them in `result`. Returns whether anything was removed.
    fn remove_failed_migrations(
        &self,
        result: &mut RepairResult,
        filter: &[MigrationPattern],
    ) -> HistoryResult<bool>;

    /// Turn a quoted identifier from a marker row back into a plain name.
    fn unquote(&self, identifier: &str) -> String {
        tm_db::sql_utils::unquote(identifier)
    }

    fn abbreviate_description(&self, description: &str) -> String {
        abbreviation::abbreviate_description(description)
    }

    fn abbreviate_script(&self, script: &str) -> String {
        abbreviation::abbreviate_script(script)
    }
}

/// Whether any row is a real migration, i.e. neither synthetic nor an undo.
pub fn has_non_synthetic_applied_migrations<H: SchemaHistory>(
    history: &H,
) -> HistoryResult<bool> {
    Ok(history
        .all_applied_migrations()?
        .iter()
        .any(|m| !m.migration_type.is_synthetic() && !m.migration_type.is_undo()))
}

/// The BASELINE row, if there is one.
///
/// A baseline can only be the first row, or the second after a schema
/// creation marker, so later rows are not considered.
pub fn baseline_marker<H: SchemaHistory>(
    history: &H,
) -> HistoryResult<Option<AppliedMigration>> {
    Ok(history
        .all_applied_migrations()?
        .into_iter()
        .take(2)
        .find(|m| m.migration_type == MigrationType::BASELINE))
}

/// Record that Tidemark created `schemas`.
pub fn add_schemas_marker<H: SchemaHistory>(
    history: &H,
    schemas: &[&dyn Schema],
) -> HistoryResult<()> {
    let script = schemas
        .iter()
        .map(|s| s.quoted_name())
        .collect::<Vec<_>>()
        .join(",");
    add_applied_migration(
        history,
        MigrationRecord::synthetic(MigrationType::SCHEMA, SCHEMA_CREATION_DESCRIPTION, script),
    )
}

/// Whether any schema creation marker exists.
pub fn has_schemas_marker<H: SchemaHistory>(history: &H) -> HistoryResult<bool> {
    Ok(history
        .all_applied_migrations()?
        .iter()
        .any(|m| m.migration_type == MigrationType::SCHEMA))
}

/// Names of every schema recorded by a schema creation marker.
pub fn created_schemas<H: SchemaHistory>(history: &H) -> HistoryResult<Vec<String>> {
    Ok(history
        .all_applied_migrations()?
        .iter()
        .filter(|m| m.migration_type == MigrationType::SCHEMA)
        .flat_map(|m| {
            m.script
                .split(',')
                .map(|name| history.unquote(name))
                .collect::<Vec<_>>()
        })
        .collect())
}

/// Append a row, assigning the next rank and abbreviating long text.
pub fn add_applied_migration<H: SchemaHistory>(
    history: &H,
    record: MigrationRecord,
) -> HistoryResult<()> {
    let installed_rank = calculate_installed_rank(history, &record.migration_type)?;
    let record = MigrationRecord {
        description: history.abbreviate_description(&record.description),
        script: history.abbreviate_script(&record.script),
        ..record
    };
    log::debug!(
        "Recording {} migration '{}' at rank {installed_rank}",
        record.migration_type,
        record.description
    );
    history.do_add_applied_migration(installed_rank, &record)
}

/// Rank for the next row of `migration_type`.
///
/// Rank 0 is reserved for a schema creation marker in an empty ledger; every
/// other first row gets rank 1. After that ranks continue from the last row.
pub fn calculate_installed_rank<H: SchemaHistory>(
    history: &H,
    migration_type: &MigrationType,
) -> HistoryResult<i32> {
    let applied = history.all_applied_migrations()?;
    Ok(match applied.last() {
        Some(last) => last.installed_rank + 1,
        None if *migration_type == MigrationType::SCHEMA => 0,
        None => 1,
    })
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
