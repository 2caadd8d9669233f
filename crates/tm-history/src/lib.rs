//! Schema history ledger for Tidemark.
//!
//! The ledger records every applied migration in a single table, oldest
//! first. [`SchemaHistory`] is the contract storage bindings implement;
//! [`DuckDbSchemaHistory`] stores rows in DuckDB and
//! [`InMemorySchemaHistory`] keeps them in memory. [`SchemaCreator`] creates
//! managed schemas and records them in the ledger.

pub mod abbreviation;
pub mod applied;
pub mod creator;
pub mod duckdb_history;
pub mod error;
pub mod history;
pub mod memory;
pub mod repair;

pub use applied::{AppliedMigration, MigrationRecord, ResolvedMigration};
pub use creator::SchemaCreator;
pub use duckdb_history::DuckDbSchemaHistory;
pub use error::{HistoryError, HistoryResult};
pub use history::{
    add_applied_migration, add_schemas_marker, baseline_marker, calculate_installed_rank,
    created_schemas, has_non_synthetic_applied_migrations, has_schemas_marker, SchemaHistory,
};
pub use memory::InMemorySchemaHistory;
pub use repair::{is_removable, MigrationPattern, RepairResult};
