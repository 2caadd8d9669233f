//! In-memory ledger for dry runs and tests.

use crate::applied::{AppliedMigration, MigrationRecord, ResolvedMigration};
use crate::error::{HistoryError, HistoryResult};
use crate::history::{add_applied_migration, SchemaHistory};
use crate::repair::{is_removable, MigrationPattern, RepairResult};
use chrono::Utc;
use std::cell::{Cell, RefCell};
use tm_core::{MigrationType, MigrationVersion};
use tm_db::DbError;

/// A ledger held in process memory.
///
/// Nothing is persisted. Dropping the table is not supported.
#[derive(Debug)]
pub struct InMemorySchemaHistory {
    rows: RefCell<Vec<AppliedMigration>>,
    exists: Cell<bool>,
    locked: Cell<bool>,
    baseline_version: MigrationVersion,
    baseline_description: String,
}

impl InMemorySchemaHistory {
    pub fn new(baseline_version: MigrationVersion, baseline_description: impl Into<String>) -> Self {
        Self {
            rows: RefCell::new(Vec::new()),
            exists: Cell::new(false),
            locked: Cell::new(false),
            baseline_version,
            baseline_description: baseline_description.into(),
        }
    }

    fn require_exists(&self, operation: &str) -> HistoryResult<()> {
        if self.exists.get() {
            Ok(())
        } else {
            Err(HistoryError::QueryError(format!(
                "cannot {operation}: schema history does not exist"
            )))
        }
    }
}

impl Default for InMemorySchemaHistory {
    fn default() -> Self {
        Self::new(MigrationVersion::from_number(1), "<< Baseline >>")
    }
}

/// Clears the lock flag when the unit of work ends, however it ends.
struct LockFlag<'a>(&'a Cell<bool>);

impl Drop for LockFlag<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl SchemaHistory for InMemorySchemaHistory {
    fn exists(&self) -> HistoryResult<bool> {
        Ok(self.exists.get())
    }

    fn create(&self, baseline: bool) -> HistoryResult<()> {
        if self.exists.replace(true) {
            return Ok(());
        }
        if baseline {
            let record = MigrationRecord::synthetic(
                MigrationType::BASELINE,
                self.baseline_description.as_str(),
                self.baseline_description.as_str(),
            )
            .with_version(self.baseline_version.clone());
            self.do_add_applied_migration(1, &record)?;
        }
        Ok(())
    }

    fn lock<T, F>(&self, unit_of_work: F) -> HistoryResult<T>
    where
        F: FnOnce() -> HistoryResult<T>,
    {
        if self.locked.replace(true) {
            return Err(HistoryError::Db(DbError::LockAcquisition {
                lock_name: "in-memory schema history".to_string(),
                source: Box::new(DbError::ExecutionError("lock is already held".to_string())),
            }));
        }
        let _flag = LockFlag(&self.locked);
        unit_of_work()
    }

    fn all_applied_migrations(&self) -> HistoryResult<Vec<AppliedMigration>> {
        Ok(self.rows.borrow().clone())
    }

    fn update(
        &self,
        applied: &AppliedMigration,
        resolved: &ResolvedMigration,
    ) -> HistoryResult<()> {
        let mut rows = self.rows.borrow_mut();
        let row = rows
            .iter_mut()
            .find(|r| r.installed_rank == applied.installed_rank)
            .ok_or_else(|| {
                HistoryError::QueryError(format!(
                    "no applied migration with rank {}",
                    applied.installed_rank
                ))
            })?;
        row.description = resolved.description.clone();
        row.migration_type = resolved.migration_type.clone();
        row.checksum = resolved.checksum;
        Ok(())
    }

    fn delete(&self, applied: &AppliedMigration) -> HistoryResult<()> {
        let mut record = MigrationRecord::synthetic(
            MigrationType::DELETE,
            applied.description.as_str(),
            applied.script.as_str(),
        );
        record.version = applied.version.clone();
        record.checksum = applied.checksum;
        add_applied_migration(self, record)
    }

    fn do_add_applied_migration(
        &self,
        installed_rank: i32,
        record: &MigrationRecord,
    ) -> HistoryResult<()> {
        self.require_exists("add applied migration")?;
        self.rows.borrow_mut().push(AppliedMigration {
            installed_rank,
            version: record.version.clone(),
            description: record.description.clone(),
            migration_type: record.migration_type.clone(),
            script: record.script.clone(),
            checksum: record.checksum,
            installed_on: Utc::now(),
            execution_time: record.execution_time,
            success: record.success,
        });
        Ok(())
    }

    fn remove_failed_migrations(
        &self,
        result: &mut RepairResult,
        filter: &[MigrationPattern],
    ) -> HistoryResult<bool> {
        let mut rows = self.rows.borrow_mut();
        let (removed, kept): (Vec<_>, Vec<_>) =
            rows.drain(..).partition(|m| is_removable(m, filter));
        *rows = kept;
        Ok(result.record_removed(removed, filter))
    }
}
