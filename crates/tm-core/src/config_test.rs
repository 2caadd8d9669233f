use super::*;
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_config() {
    let config = TidemarkConfig::from_yaml("{}").unwrap();
    assert_eq!(config.locations.len(), 1);
    assert_eq!(config.locations[0].descriptor(), "classpath:db/migration");
    assert_eq!(config.table, "tidemark_schema_history");
    assert_eq!(config.database.path, ":memory:");
    assert_eq!(config.database.name, None);
    assert!(config.create_schemas);
    assert_eq!(config.baseline_version.to_string(), "1");
    assert_eq!(config.baseline_description, "<< Baseline >>");
    assert_eq!(config.lock.discriminator, 0);
    assert_eq!(config.lock_timeout(), Duration::from_secs(3600));
    assert_eq!(config.connect_retries, 0);
    assert_eq!(config.schema_creation.max_attempts, 10);
    assert_eq!(config.schema_creation.delay_ms, 1000);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
locations:
  - filesystem:sql/migrations
  - "classpath:db/**/*.sql"
schemas: [analytics, staging]
default_schema: staging
table: history
database:
  path: "./warehouse.duckdb"
  name: warehouse
create_schemas: false
baseline_version: "2_1"
baseline_description: initial import
lock:
  discriminator: 7
  timeout_secs: 30
connect_retries: 3
connect_retries_interval: 10
schema_creation:
  max_attempts: 2
  delay_ms: 0
"#;
    let config = TidemarkConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.locations.len(), 2);
    assert!(config.locations[0].is_file_system());
    assert!(config.locations[1].path_pattern().is_some());
    assert_eq!(config.schemas, vec!["analytics", "staging"]);
    assert_eq!(config.table, "history");
    assert_eq!(config.database.name.as_deref(), Some("warehouse"));
    assert!(!config.create_schemas);
    assert_eq!(config.baseline_version.to_string(), "2.1");
    assert_eq!(config.lock.discriminator, 7);
    assert_eq!(config.lock_timeout(), Duration::from_secs(30));

    let policy = config.schema_creation_policy();
    assert_eq!(policy.max_attempts, 2);
    assert_eq!(policy.delay, Duration::ZERO);

    let delays: Vec<u64> = config.connect_backoff().take(6).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);
}

#[test]
fn test_unknown_field_rejected() {
    let err = TidemarkConfig::from_yaml("tabel: typo").unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
}

#[test]
fn test_unknown_location_prefix_rejected() {
    let err = TidemarkConfig::from_yaml("locations: [\"ftp:db\"]").unwrap_err();
    match err {
        CoreError::ConfigParseError { message } => {
            assert!(message.contains("Unknown prefix for location"), "{message}")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_locations_rejected() {
    let err = TidemarkConfig::from_yaml("locations: []").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_zero_attempts_rejected() {
    let err = TidemarkConfig::from_yaml("schema_creation:\n  max_attempts: 0").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_zero_lock_timeout_rejected() {
    let err = TidemarkConfig::from_yaml("lock:\n  timeout_secs: 0").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_blank_table_rejected() {
    let err = TidemarkConfig::from_yaml("table: \"  \"").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_history_schema_precedence() {
    let config = TidemarkConfig::default();
    assert_eq!(config.history_schema(), None);

    let config = TidemarkConfig::from_yaml("schemas: [a, b]").unwrap();
    assert_eq!(config.history_schema(), Some("a"));

    let config = TidemarkConfig::from_yaml("schemas: [a, b]\ndefault_schema: c").unwrap();
    assert_eq!(config.history_schema(), Some("c"));
}

#[test]
fn test_load_from_dir_prefers_yml() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tidemark.yml"), "table: from_yml").unwrap();
    std::fs::write(dir.path().join("tidemark.yaml"), "table: from_yaml").unwrap();

    let config = TidemarkConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.table, "from_yml");
}

#[test]
fn test_load_from_dir_falls_back_to_yaml() {
    let dir = TempDir::new().unwrap();
    let mut file = std::fs::File::create(dir.path().join("tidemark.yaml")).unwrap();
    writeln!(file, "schemas: [public]").unwrap();

    let config = TidemarkConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.history_schema(), Some("public"));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let err = TidemarkConfig::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));

    let err = TidemarkConfig::load(&dir.path().join("nope.yml")).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_blank_database_name_rejected() {
    let err = TidemarkConfig::from_yaml("database:\n  name: \" \"").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}
