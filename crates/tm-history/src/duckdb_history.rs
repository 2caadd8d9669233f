//! Schema history stored in a DuckDB table.

use crate::applied::{AppliedMigration, MigrationRecord, ResolvedMigration};
use crate::error::{HistoryError, HistoryResult};
use crate::history::{add_applied_migration, SchemaHistory};
use crate::repair::{is_removable, MigrationPattern, RepairResult};
use chrono::DateTime;
use std::cell::RefCell;
use tm_core::{MigrationType, MigrationTypeRegistry, MigrationVersion, TidemarkConfig};
use tm_db::sql_utils::{quote_ident, quote_qualified};
use tm_db::{DuckDbBackend, ExclusiveLock, ProcessLock, SqlExecutor};

/// Raw row as read from the table, before type resolution.
type RawRow = (
    i32,
    Option<String>,
    String,
    String,
    String,
    Option<i32>,
    i64,
    i32,
    bool,
);

/// Ledger backed by one table in one DuckDB schema.
///
/// Rows are cached after the first read. Later reads fetch only rows ranked
/// above the newest cached one; any mutation other than an append clears the
/// cache.
pub struct DuckDbSchemaHistory<'c, L: ExclusiveLock = ProcessLock> {
    backend: &'c DuckDbBackend,
    schema: String,
    table: String,
    lock: L,
    registry: MigrationTypeRegistry,
    baseline_version: MigrationVersion,
    baseline_description: String,
    cache: RefCell<Vec<AppliedMigration>>,
}

impl<'c> DuckDbSchemaHistory<'c, ProcessLock> {
    /// Build the ledger described by `config`, guarded by a process lock.
    ///
    /// The table lives in the configured history schema, falling back to the
    /// connection's current schema.
    pub fn from_config(backend: &'c DuckDbBackend, config: &TidemarkConfig) -> HistoryResult<Self> {
        if let Some(database) = &config.database.name {
            backend.use_database(database)?;
        }
        let schema = match config.history_schema() {
            Some(schema) => schema.to_string(),
            None => backend.current_schema()?.ok_or_else(|| {
                HistoryError::Configuration(
                    "Unable to determine schema for the schema history table. \
                     Set a default schema for the connection or specify one using the default_schema property!"
                        .to_string(),
                )
            })?,
        };
        let lock = ProcessLock::for_discriminator(config.lock.discriminator)
            .with_timeout(config.lock_timeout());
        Ok(Self::new(backend, schema, config.table.clone(), lock)
            .with_baseline(config.baseline_version.clone(), config.baseline_description.clone()))
    }
}

impl<'c, L: ExclusiveLock> DuckDbSchemaHistory<'c, L> {
    pub fn new(
        backend: &'c DuckDbBackend,
        schema: impl Into<String>,
        table: impl Into<String>,
        lock: L,
    ) -> Self {
        Self {
            backend,
            schema: schema.into(),
            table: table.into(),
            lock,
            registry: MigrationTypeRegistry::default(),
            baseline_version: MigrationVersion::from_number(1),
            baseline_description: "<< Baseline >>".to_string(),
            cache: RefCell::new(Vec::new()),
        }
    }

    /// Version and description of the row written by `create(true)`.
    pub fn with_baseline(mut self, version: MigrationVersion, description: impl Into<String>) -> Self {
        self.baseline_version = version;
        self.baseline_description = description.into();
        self
    }

    /// Resolve stored type names through `registry` instead of the core types.
    pub fn with_registry(mut self, registry: MigrationTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Schema-qualified, quoted table name.
    pub fn qualified_table(&self) -> String {
        quote_qualified(&self.schema, &self.table)
    }

    fn execute(&self, sql: &str, params: &[&dyn duckdb::ToSql]) -> HistoryResult<()> {
        self.backend.with_conn(|conn| {
            conn.execute(sql, params)
                .map_err(|e| HistoryError::QueryError(format!("{e}: {sql}")))?;
            Ok(())
        })
    }

    fn fetch_from(&self, after_rank: i32) -> HistoryResult<Vec<AppliedMigration>> {
        let sql = format!(
            "SELECT installed_rank, version, description, \"type\", script, checksum, \
             epoch_ms(installed_on), execution_time, success \
             FROM {} WHERE installed_rank > ? ORDER BY installed_rank",
            self.qualified_table()
        );
        let raw: Vec<RawRow> = self.backend.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([after_rank], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                })?
                .collect::<Result<Vec<RawRow>, _>>()?;
            Ok::<_, HistoryError>(rows)
        })?;
        raw.into_iter().map(|row| self.to_applied(row)).collect()
    }

    fn to_applied(&self, row: RawRow) -> HistoryResult<AppliedMigration> {
        let (rank, version, description, type_name, script, checksum, installed_ms, time, success) =
            row;
        let migration_type = self
            .registry
            .resolve(&type_name)
            .cloned()
            .ok_or(HistoryError::UnknownMigrationType { name: type_name })?;
        let version = version.as_deref().map(MigrationVersion::parse).transpose()?;
        let installed_on = DateTime::from_timestamp_millis(installed_ms).ok_or_else(|| {
            HistoryError::QueryError(format!("invalid installed_on for rank {rank}"))
        })?;
        Ok(AppliedMigration {
            installed_rank: rank,
            version,
            description,
            migration_type,
            script,
            checksum,
            installed_on,
            execution_time: time,
            success,
        })
    }

    fn delete_rank(&self, rank: i32) -> HistoryResult<()> {
        self.execute(
            &format!(
                "DELETE FROM {} WHERE installed_rank = ?",
                self.qualified_table()
            ),
            &[&rank],
        )
    }
}

impl<L: ExclusiveLock> SchemaHistory for DuckDbSchemaHistory<'_, L> {
    fn exists(&self) -> HistoryResult<bool> {
        let count: i64 = self.backend.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_catalog = current_database() AND table_schema = ? AND table_name = ?",
                [&self.schema, &self.table],
                |row| row.get(0),
            )
            .map_err(HistoryError::from)
        })?;
        Ok(count > 0)
    }

    fn create(&self, baseline: bool) -> HistoryResult<()> {
        if self.exists()? {
            log::debug!("Schema history table {} already exists", self.qualified_table());
            return Ok(());
        }

        log::info!("Creating schema history table {}", self.qualified_table());
        let table = self.qualified_table();
        self.backend.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                installed_rank INTEGER NOT NULL PRIMARY KEY,
                version VARCHAR,
                description VARCHAR NOT NULL,
                \"type\" VARCHAR NOT NULL,
                script VARCHAR NOT NULL,
                checksum INTEGER,
                installed_on TIMESTAMP NOT NULL DEFAULT current_timestamp,
                execution_time INTEGER NOT NULL,
                success BOOLEAN NOT NULL
            );
            CREATE INDEX IF NOT EXISTS {index} ON {table} (success);",
            index = quote_ident(&format!("{}_s_idx", self.table)),
        ))?;
        self.clear_cache();

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

    fn drop(&self) -> HistoryResult<()> {
        log::info!("Dropping schema history table {}", self.qualified_table());
        self.backend
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", self.qualified_table()))?;
        self.clear_cache();
        Ok(())
    }

    fn lock<T, F>(&self, unit_of_work: F) -> HistoryResult<T>
    where
        F: FnOnce() -> HistoryResult<T>,
    {
        self.lock.execute(|| {
            // Other processes may have written while we waited.
            self.clear_cache();
            unit_of_work()
        })
    }

    fn all_applied_migrations(&self) -> HistoryResult<Vec<AppliedMigration>> {
        let last_rank = self.cache.borrow().last().map(|m| m.installed_rank);
        let after_rank = match last_rank {
            Some(rank) => rank,
            None if !self.exists()? => return Ok(Vec::new()),
            None => -1,
        };

        let fresh = self.fetch_from(after_rank)?;
        let mut cache = self.cache.borrow_mut();
        cache.extend(fresh);
        Ok(cache.clone())
    }

    fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    fn update(
        &self,
        applied: &AppliedMigration,
        resolved: &ResolvedMigration,
    ) -> HistoryResult<()> {
        self.clear_cache();
        self.execute(
            &format!(
                "UPDATE {} SET description = ?, \"type\" = ?, checksum = ? WHERE installed_rank = ?",
                self.qualified_table()
            ),
            &[
                &self.abbreviate_description(&resolved.description),
                &resolved.migration_type.name(),
                &resolved.checksum,
                &applied.installed_rank,
            ],
        )
    }

    fn delete(&self, applied: &AppliedMigration) -> HistoryResult<()> {
        self.clear_cache();
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
        let version = record.version.as_ref().map(MigrationVersion::to_string);
        self.execute(
            &format!(
                "INSERT INTO {} (installed_rank, version, description, \"type\", script, \
                 checksum, execution_time, success) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                self.qualified_table()
            ),
            &[
                &installed_rank,
                &version,
                &record.description,
                &record.migration_type.name(),
                &record.script,
                &record.checksum,
                &record.execution_time,
                &record.success,
            ],
        )
    }

    fn remove_failed_migrations(
        &self,
        result: &mut RepairResult,
        filter: &[MigrationPattern],
    ) -> HistoryResult<bool> {
        let failed: Vec<AppliedMigration> = self
            .all_applied_migrations()?
            .into_iter()
            .filter(|m| is_removable(m, filter))
            .collect();
        if failed.is_empty() {
            log::debug!("No failed migrations to remove from {}", self.qualified_table());
            return Ok(result.record_removed(failed, filter));
        }

        self.clear_cache();
        for migration in &failed {
            self.delete_rank(migration.installed_rank)?;
        }
        log::info!(
            "Removed {} failed migration(s) from {}",
            failed.len(),
            self.qualified_table()
        );
        Ok(result.record_removed(failed, filter))
    }
}

#[cfg(test)]
#[path = "duckdb_history_test.rs"]
mod tests;
