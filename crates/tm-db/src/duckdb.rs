//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::sql_utils::quote_ident;
use crate::traits::{Schema, SqlExecutor, TransactionRunner};
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tm_core::Backoff;

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Open `path`, retrying up to `retries` times on connection failure.
    ///
    /// Each retry waits the next value of `backoff`, in seconds.
    pub fn open_with_retries(path: &str, retries: u32, backoff: Backoff) -> DbResult<Self> {
        retry_connection(retries, backoff, Duration::from_secs(1), || Self::new(path))
    }

    /// Lock and borrow the underlying connection.
    pub fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Run `f` against the locked connection.
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self.conn()?;
        f(&conn)
    }

    /// Execute batch SQL
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn()?
            .execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    /// Name of the connection's current schema, if one is set.
    pub fn current_schema(&self) -> DbResult<Option<String>> {
        let schema: Option<String> =
            self.conn()?
                .query_row("SELECT current_schema()", [], |row| row.get(0))?;
        Ok(schema)
    }

    /// A handle on the schema `name` in this database.
    pub fn schema(&self, name: Option<&str>) -> DuckDbSchema<'_> {
        DuckDbSchema {
            backend: self,
            name: name.map(str::to_string),
        }
    }
}

impl SqlExecutor for DuckDbBackend {
    fn use_database(&self, database: &str) -> DbResult<()> {
        self.execute_batch(&format!("USE {}", quote_ident(database)))
    }

    fn execute(&self, sql: &str, params: &[&str]) -> DbResult<()> {
        self.conn()?
            .execute(sql, duckdb::params_from_iter(params.iter()))
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;
        Ok(())
    }
}

impl TransactionRunner for DuckDbBackend {
    fn in_transaction<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<DbError>,
    {
        self.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body();

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.execute_batch("COMMIT") {
                    if let Err(e) = self.execute_batch("ROLLBACK") {
                        log::warn!("ROLLBACK after failed COMMIT failed: {e}");
                    }
                    return Err(E::from(DbError::TransactionError(format!(
                        "COMMIT failed: {commit_err}"
                    ))));
                }
            }
            Err(_) => {
                if let Err(e) = self.execute_batch("ROLLBACK") {
                    log::warn!("ROLLBACK failed: {e}");
                }
            }
        }
        result
    }
}

/// Call `connect` until it succeeds, retrying connection errors up to
/// `retries` times. Each retry waits the next backoff value, in `unit`s.
fn retry_connection<T, F>(retries: u32, backoff: Backoff, unit: Duration, mut connect: F) -> DbResult<T>
where
    F: FnMut() -> DbResult<T>,
{
    let mut backoff = backoff;
    let mut attempt = 0;
    loop {
        match connect() {
            Ok(conn) => return Ok(conn),
            Err(DbError::ConnectionError(msg)) if attempt < retries => {
                attempt += 1;
                let (wait, next) = backoff.advance();
                backoff = next;
                let delay = unit.saturating_mul(u32::try_from(wait).unwrap_or(u32::MAX));
                log::warn!(
                    "Connection error: {msg} (retrying in {delay:?}, attempt {attempt}/{retries})"
                );
                std::thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// A schema in a DuckDB database.
pub struct DuckDbSchema<'c> {
    backend: &'c DuckDbBackend,
    name: Option<String>,
}

impl Schema for DuckDbSchema<'_> {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn exists(&self) -> DbResult<bool> {
        let Some(name) = &self.name else {
            return Ok(false);
        };
        let count: i64 = self.backend.conn()?.query_row(
            "SELECT COUNT(*) FROM information_schema.schemata \
             WHERE catalog_name = current_database() AND schema_name = ?",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn create(&self) -> DbResult<()> {
        self.backend
            .execute_batch(&format!("CREATE SCHEMA {}", self.quoted_name()))
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
