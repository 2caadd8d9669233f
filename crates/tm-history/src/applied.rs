//! Rows of the schema history table.

use chrono::{DateTime, Utc};
use tm_core::{MigrationType, MigrationVersion};

/// A migration recorded in the schema history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    /// Unique, strictly increasing in insertion order
    pub installed_rank: i32,
    /// `None` for repeatable migrations and most synthetic rows
    pub version: Option<MigrationVersion>,
    pub description: String,
    pub migration_type: MigrationType,
    pub script: String,
    pub checksum: Option<i32>,
    /// Assigned by storage on insert
    pub installed_on: DateTime<Utc>,
    /// Milliseconds
    pub execution_time: i32,
    pub success: bool,
}

/// A row to be appended to the ledger, before storage assigns a rank and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub version: Option<MigrationVersion>,
    pub description: String,
    pub migration_type: MigrationType,
    pub script: String,
    pub checksum: Option<i32>,
    pub execution_time: i32,
    pub success: bool,
}

impl MigrationRecord {
    /// A successful, zero-duration row with no version or checksum.
    pub fn synthetic(
        migration_type: MigrationType,
        description: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            version: None,
            description: description.into(),
            migration_type,
            script: script.into(),
            checksum: None,
            execution_time: 0,
            success: true,
        }
    }

    /// Attach a version.
    pub fn with_version(mut self, version: MigrationVersion) -> Self {
        self.version = Some(version);
        self
    }
}

/// A migration discovered in a location, as the resolver describes it.
///
/// Used by [`SchemaHistory::update`](crate::SchemaHistory::update) to realign
/// a recorded row with its current source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMigration {
    pub version: Option<MigrationVersion>,
    pub description: String,
    pub script: String,
    pub checksum: Option<i32>,
    pub migration_type: MigrationType,
}
