//! Configuration types and parsing for tidemark.yml

use crate::backoff::Backoff;
use crate::error::{CoreError, CoreResult};
use crate::location::Location;
use crate::retry::RetryPolicy;
use crate::version::MigrationVersion;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration from tidemark.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TidemarkConfig {
    /// Locations to discover migrations from
    #[serde(default = "default_locations")]
    pub locations: Vec<Location>,

    /// Schemas managed by Tidemark. The first one holds the history table
    /// unless `default_schema` is set.
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Schema holding the history table
    #[serde(default)]
    pub default_schema: Option<String>,

    /// Name of the schema history table
    #[serde(default = "default_table")]
    pub table: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Whether missing managed schemas are created
    #[serde(default = "default_true")]
    pub create_schemas: bool,

    /// Version recorded in the baseline marker
    #[serde(default = "default_baseline_version")]
    pub baseline_version: MigrationVersion,

    /// Description recorded in the baseline marker
    #[serde(default = "default_baseline_description")]
    pub baseline_description: String,

    /// Advisory lock settings
    #[serde(default)]
    pub lock: LockConfig,

    /// How many times to retry opening the database (0 = no retries)
    #[serde(default)]
    pub connect_retries: u32,

    /// Upper bound in seconds for the pause between connection attempts
    #[serde(default = "default_connect_retries_interval")]
    pub connect_retries_interval: u64,

    /// Retry policy for schema creation
    #[serde(default)]
    pub schema_creation: RetryConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Database (catalog) selected before the ledger is read and before
    /// locking. Unset keeps the connection's current database.
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            name: None,
        }
    }
}

/// Advisory lock configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Separates independent lock domains on the same database
    #[serde(default)]
    pub discriminator: u32,

    /// Maximum time to wait for the lock, in seconds
    #[serde(default = "default_lock_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            discriminator: 0,
            timeout_secs: default_lock_timeout_secs(),
        }
    }
}

/// Fixed-delay retry configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        RetryPolicy::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }
}

const DEFAULT_TABLE: &str = "tidemark_schema_history";

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_true() -> bool {
    true
}

fn default_locations() -> Vec<Location> {
    match Location::new("db/migration") {
        Ok(location) => vec![location],
        Err(_) => Vec::new(),
    }
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_baseline_version() -> MigrationVersion {
    MigrationVersion::from_number(1)
}

fn default_baseline_description() -> String {
    "<< Baseline >>".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    3600
}

fn default_connect_retries_interval() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    RetryPolicy::SCHEMA_CREATION.max_attempts
}

fn default_delay_ms() -> u64 {
    RetryPolicy::SCHEMA_CREATION.delay.as_millis() as u64
}

impl Default for TidemarkConfig {
    fn default() -> Self {
        Self {
            locations: default_locations(),
            schemas: Vec::new(),
            default_schema: None,
            table: default_table(),
            database: DatabaseConfig::default(),
            create_schemas: true,
            baseline_version: default_baseline_version(),
            baseline_description: default_baseline_description(),
            lock: LockConfig::default(),
            connect_retries: 0,
            connect_retries_interval: default_connect_retries_interval(),
            schema_creation: RetryConfig::default(),
        }
    }
}

impl TidemarkConfig {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a project directory
    /// Looks for tidemark.yml or tidemark.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("tidemark.yml");
        let yaml_path = dir.join("tidemark.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let config: TidemarkConfig =
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.locations.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one location must be specified".to_string(),
            });
        }

        if self.table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Schema history table name cannot be empty".to_string(),
            });
        }

        if let Some(schema) = self.schemas.iter().find(|s| s.trim().is_empty()) {
            return Err(CoreError::ConfigInvalid {
                message: format!("Invalid empty schema name in schemas: '{schema}'"),
            });
        }

        if self.schema_creation.max_attempts == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "schema_creation.max_attempts must be at least 1".to_string(),
            });
        }

        if self
            .database
            .name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(CoreError::ConfigInvalid {
                message: "database.name cannot be empty".to_string(),
            });
        }

        if self.lock.timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lock.timeout_secs must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// The schema that holds the history table, if one can be determined
    /// from configuration alone.
    pub fn history_schema(&self) -> Option<&str> {
        self.default_schema
            .as_deref()
            .or_else(|| self.schemas.first().map(String::as_str))
    }

    /// Maximum time to wait for the advisory lock
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock.timeout_secs)
    }

    /// Retry policy for schema creation
    pub fn schema_creation_policy(&self) -> RetryPolicy {
        self.schema_creation.into()
    }

    /// Backoff between connection attempts, in seconds
    pub fn connect_backoff(&self) -> Backoff {
        Backoff::new(1, 2, self.connect_retries_interval)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
