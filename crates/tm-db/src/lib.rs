//! tm-db - Database layer for Tidemark
//!
//! This crate provides the narrow database capabilities the migration core
//! depends on (`SqlExecutor`, `TransactionRunner`, `Schema`), a DuckDB
//! backend implementing them, and the advisory lock coordinator.

pub mod duckdb;
pub mod error;
pub mod lock;
pub mod sql_utils;
pub mod traits;

pub use duckdb::{DuckDbBackend, DuckDbSchema};
pub use error::{DbError, DbResult};
pub use lock::{
    ExclusiveLock, LockCoordinator, LockGuard, LockStatement, LockStatements,
    PostgresAdvisoryLock, ProcessLock, SqlServerAppLock,
};
pub use traits::{Schema, SqlExecutor, TransactionRunner};
