//! Database capability traits
//!
//! Higher layers depend on these narrow capabilities rather than on a
//! concrete backend, so locking and schema creation can be exercised against
//! recording fakes.

use crate::error::{DbError, DbResult};
use crate::sql_utils::quote_ident;

/// Executes single SQL statements.
pub trait SqlExecutor {
    /// Make `database` the current database for subsequent statements.
    fn use_database(&self, database: &str) -> DbResult<()>;

    /// Execute one statement, binding `params` positionally.
    fn execute(&self, sql: &str, params: &[&str]) -> DbResult<()>;
}

/// Runs a unit of work inside a database transaction.
pub trait TransactionRunner {
    /// Execute `body` between `BEGIN` and `COMMIT`, rolling back if it fails.
    fn in_transaction<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<DbError>;
}

/// A database schema that may or may not exist yet.
pub trait Schema {
    /// The schema name, if it could be determined.
    fn name(&self) -> Option<&str>;

    /// Whether the schema exists.
    fn exists(&self) -> DbResult<bool>;

    /// Create the schema.
    fn create(&self) -> DbResult<()>;

    /// The name as a quoted identifier.
    fn quoted_name(&self) -> String {
        quote_ident(self.name().unwrap_or_default())
    }
}
