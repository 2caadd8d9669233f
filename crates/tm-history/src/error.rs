//! Error types for the schema history ledger.

use thiserror::Error;
use tm_core::CoreError;
use tm_db::DbError;

/// Schema history errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Setup that no retry can fix, e.g. a schema without a name (H001).
    #[error("[H001] {0}")]
    Configuration(String),

    /// The ledger binding does not support the operation (H002).
    #[error("[H002] {operation} is not supported for this schema history")]
    Unsupported { operation: String },

    /// SQL execution error against the history table (H003).
    #[error("[H003] Schema history query failed: {0}")]
    QueryError(String),

    /// A stored row names a migration type nobody registered (H004).
    #[error("[H004] Unknown migration type '{name}' in schema history")]
    UnknownMigrationType { name: String },

    /// Database layer error (H005).
    #[error(transparent)]
    Db(#[from] DbError),

    /// Core error, e.g. an unparseable stored version (H006).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// DuckDB driver error with preserved source chain (H007).
    #[error("[H007] DuckDB error: {0}")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`HistoryError`].
pub type HistoryResult<T> = Result<T, HistoryError>;

impl From<duckdb::Error> for HistoryError {
    fn from(err: duckdb::Error) -> Self {
        HistoryError::DuckDb(err)
    }
}

impl HistoryError {
    /// Whether retrying the failed unit of work could succeed.
    ///
    /// Configuration problems are permanent; everything else is treated as a
    /// transient storage failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            HistoryError::Configuration(_) => false,
            HistoryError::Core(e) => !e.is_configuration(),
            _ => true,
        }
    }
}
