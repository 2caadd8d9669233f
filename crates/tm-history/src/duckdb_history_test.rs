use super::*;
use crate::history::{
    add_schemas_marker, baseline_marker, calculate_installed_rank, created_schemas,
    has_non_synthetic_applied_migrations, has_schemas_marker,
};
use tm_core::MigrationTypeFlags;
use tm_db::Schema;

fn backend() -> DuckDbBackend {
    DuckDbBackend::in_memory().unwrap()
}

fn history(db: &DuckDbBackend) -> DuckDbSchemaHistory<'_> {
    DuckDbSchemaHistory::new(db, "main", "tidemark_schema_history", ProcessLock::named("duckdb_history_test"))
}

fn sql(version: &str, description: &str, success: bool) -> MigrationRecord {
    let mut record = MigrationRecord::synthetic(
        MigrationType::SQL,
        description,
        format!("V{version}__{}.sql", description.replace(' ', "_")),
    )
    .with_version(MigrationVersion::parse(version).unwrap());
    record.checksum = Some(12345);
    record.execution_time = 17;
    record.success = success;
    record
}

fn row_count(db: &DuckDbBackend) -> i64 {
    db.conn()
        .unwrap()
        .query_row(
            "SELECT COUNT(*) FROM main.tidemark_schema_history",
            [],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn test_missing_table_reads_empty() {
    let db = backend();
    let history = history(&db);
    assert!(!history.exists().unwrap());
    assert!(history.all_applied_migrations().unwrap().is_empty());
}

#[test]
fn test_create_without_baseline() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    assert!(history.exists().unwrap());
    assert_eq!(row_count(&db), 0);
    // Re-creation is a no-op.
    history.create(true).unwrap();
    assert_eq!(row_count(&db), 0);
}

#[test]
fn test_create_with_baseline_row() {
    let db = backend();
    let history = history(&db).with_baseline(MigrationVersion::parse("3").unwrap(), "imported");
    history.create(true).unwrap();

    let marker = baseline_marker(&history).unwrap().unwrap();
    assert_eq!(marker.installed_rank, 1);
    assert_eq!(marker.version, Some(MigrationVersion::parse("3").unwrap()));
    assert_eq!(marker.description, "imported");
    assert_eq!(marker.script, "imported");
    assert_eq!(marker.checksum, None);
    assert!(marker.success);
    assert!(!has_non_synthetic_applied_migrations(&history).unwrap());
}

#[test]
fn test_rows_round_trip_through_table() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    add_applied_migration(&history, sql("1", "create users", true)).unwrap();
    add_applied_migration(&history, sql("1.1", "add email", false)).unwrap();

    history.clear_cache();
    let rows = history.all_applied_migrations().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].installed_rank, 1);
    assert_eq!(rows[1].installed_rank, 2);
    assert_eq!(rows[0].script, "V1__create_users.sql");
    assert_eq!(rows[0].checksum, Some(12345));
    assert_eq!(rows[0].execution_time, 17);
    assert_eq!(rows[1].version.as_ref().unwrap().to_string(), "1.1");
    assert!(!rows[1].success);
    assert!(rows[0].installed_on.timestamp() > 0);
    assert!(has_non_synthetic_applied_migrations(&history).unwrap());
}

#[test]
fn test_cache_picks_up_appended_rows() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    add_applied_migration(&history, sql("1", "one", true)).unwrap();
    assert_eq!(history.all_applied_migrations().unwrap().len(), 1);

    add_applied_migration(&history, sql("2", "two", true)).unwrap();
    let rows = history.all_applied_migrations().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].description, "two");
}

#[test]
fn test_schema_marker_gets_rank_zero() {
    let db = backend();
    db.execute_batch("CREATE SCHEMA \"sales\"").unwrap();
    let history = history(&db);
    history.create(false).unwrap();
    assert_eq!(
        calculate_installed_rank(&history, &MigrationType::SCHEMA).unwrap(),
        0
    );

    let sales = db.schema(Some("sales"));
    let main = db.schema(Some("main"));
    add_schemas_marker(&history, &[&sales as &dyn Schema, &main]).unwrap();

    let rows = history.all_applied_migrations().unwrap();
    assert_eq!(rows[0].installed_rank, 0);
    assert_eq!(rows[0].script, r#""sales","main""#);
    assert!(has_schemas_marker(&history).unwrap());
    assert_eq!(created_schemas(&history).unwrap(), vec!["sales", "main"]);
}

#[test]
fn test_update_realigns_row() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    add_applied_migration(&history, sql("1", "old name", true)).unwrap();
    let applied = history.all_applied_migrations().unwrap().remove(0);

    let resolved = ResolvedMigration {
        version: applied.version.clone(),
        description: "new name".to_string(),
        script: applied.script.clone(),
        checksum: Some(999),
        migration_type: MigrationType::SQL_BASELINE,
    };
    history.update(&applied, &resolved).unwrap();

    let row = history.all_applied_migrations().unwrap().remove(0);
    assert_eq!(row.description, "new name");
    assert_eq!(row.checksum, Some(999));
    assert_eq!(row.migration_type, MigrationType::SQL_BASELINE);
}

#[test]
fn test_delete_appends_marker() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    add_applied_migration(&history, sql("1", "one", true)).unwrap();
    let applied = history.all_applied_migrations().unwrap().remove(0);

    history.delete(&applied).unwrap();

    let rows = history.all_applied_migrations().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].migration_type, MigrationType::DELETE);
    assert_eq!(rows[1].version, applied.version);
    assert_eq!(rows[1].installed_rank, 2);
}

#[test]
fn test_remove_failed_migrations() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    add_applied_migration(&history, sql("1", "one", true)).unwrap();
    add_applied_migration(&history, sql("2", "two", false)).unwrap();
    add_applied_migration(&history, sql("3", "three", false)).unwrap();

    let mut result = RepairResult::new();
    let removed = history
        .remove_failed_migrations(&mut result, &[MigrationPattern::new("3")])
        .unwrap();
    assert!(removed);
    assert_eq!(result.migrations_removed.len(), 1);
    assert_eq!(row_count(&db), 2);

    let removed = history.remove_failed_migrations(&mut result, &[]).unwrap();
    assert!(removed);
    assert_eq!(result.migrations_removed.len(), 2);
    assert_eq!(row_count(&db), 1);

    assert!(!history.remove_failed_migrations(&mut result, &[]).unwrap());
}

#[test]
fn test_unknown_type_is_reported() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    let custom = MigrationType::new("JAVA", MigrationTypeFlags::default());
    add_applied_migration(
        &history,
        MigrationRecord::synthetic(custom.clone(), "code", "V1__code"),
    )
    .unwrap();

    history.clear_cache();
    let err = history.all_applied_migrations().unwrap_err();
    assert!(matches!(err, HistoryError::UnknownMigrationType { ref name } if name == "JAVA"));

    let mut registry = MigrationTypeRegistry::with_core_types();
    registry.register(custom).unwrap();
    let history = history.with_registry(registry);
    assert_eq!(history.all_applied_migrations().unwrap().len(), 1);
}

#[test]
fn test_drop_removes_table() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    add_applied_migration(&history, sql("1", "one", true)).unwrap();
    history.drop().unwrap();
    assert!(!history.exists().unwrap());
    assert!(history.all_applied_migrations().unwrap().is_empty());
}

#[test]
fn test_lock_clears_cache_and_runs_work() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    add_applied_migration(&history, sql("1", "one", true)).unwrap();
    assert_eq!(history.all_applied_migrations().unwrap().len(), 1);

    let ranks = history
        .lock(|| {
            add_applied_migration(&history, sql("2", "two", true))?;
            Ok(history
                .all_applied_migrations()?
                .iter()
                .map(|m| m.installed_rank)
                .collect::<Vec<_>>())
        })
        .unwrap();
    assert_eq!(ranks, vec![1, 2]);
}

#[test]
fn test_from_config_uses_configured_schema() {
    let db = backend();
    db.execute_batch("CREATE SCHEMA ops").unwrap();
    let config = TidemarkConfig::from_yaml("schemas: [ops]\ntable: history").unwrap();
    let history = DuckDbSchemaHistory::from_config(&db, &config).unwrap();
    assert_eq!(history.qualified_table(), r#""ops"."history""#);
    history.create(true).unwrap();
    assert!(baseline_marker(&history).unwrap().is_some());
}

#[test]
fn test_from_config_falls_back_to_current_schema() {
    let db = backend();
    let config = TidemarkConfig::default();
    let history = DuckDbSchemaHistory::from_config(&db, &config).unwrap();
    assert_eq!(
        history.qualified_table(),
        r#""main"."tidemark_schema_history""#
    );
}

#[test]
fn test_remove_failed_keeps_failed_baseline() {
    let db = backend();
    let history = history(&db);
    history.create(false).unwrap();
    let mut baseline = MigrationRecord::synthetic(MigrationType::BASELINE, "base", "base")
        .with_version(MigrationVersion::parse("1").unwrap());
    baseline.success = false;
    add_applied_migration(&history, baseline).unwrap();
    add_applied_migration(&history, sql("2", "two", false)).unwrap();

    let mut result = RepairResult::new();
    assert!(history.remove_failed_migrations(&mut result, &[]).unwrap());
    assert_eq!(result.migrations_removed.len(), 1);
    assert_eq!(result.migrations_removed[0].migration_type, MigrationType::SQL);
    assert_eq!(row_count(&db), 1);
    assert!(baseline_marker(&history).unwrap().is_some());

    let unmatched = history
        .remove_failed_migrations(&mut result, &[MigrationPattern::new("1")])
        .unwrap();
    assert!(!unmatched);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(row_count(&db), 1);
}

#[test]
fn test_from_config_selects_configured_database() {
    let dir = tempfile::TempDir::new().unwrap();
    let attached = dir.path().join("ops.duckdb");
    let db = backend();
    db.execute_batch(&format!(
        "ATTACH '{}' AS ops",
        attached.display().to_string().replace('\\', "/")
    ))
    .unwrap();

    let config = TidemarkConfig::from_yaml("database:\n  name: ops").unwrap();
    let history = DuckDbSchemaHistory::from_config(&db, &config).unwrap();
    history.create(false).unwrap();

    let catalog: String = db
        .conn()
        .unwrap()
        .query_row(
            "SELECT table_catalog FROM information_schema.tables \
             WHERE table_name = 'tidemark_schema_history'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(catalog, "ops");
}

#[test]
fn test_from_config_unknown_database_fails() {
    let db = backend();
    let config = TidemarkConfig::from_yaml("database:\n  name: nowhere").unwrap();
    assert!(DuckDbSchemaHistory::from_config(&db, &config).is_err());
}
