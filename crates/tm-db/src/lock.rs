//! Advisory locks that serialize migrations across processes.
//!
//! A [`LockCoordinator`] wraps a unit of work in acquire/release statements
//! for a named, session-scoped database lock. The SQL comes from a
//! [`LockStatements`] implementation for the target vendor. Embedded
//! single-process databases use [`ProcessLock`] instead.

use crate::error::{DbError, DbResult};
use crate::traits::SqlExecutor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, TryLockError};
use std::time::{Duration, Instant};
use tm_core::TidemarkConfig;

/// Default ceiling on how long to wait for a lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(3600);

const PROCESS_LOCK_POLL: Duration = Duration::from_millis(10);

/// Deterministic lock name for a discriminator.
///
/// Distinct discriminators give independent lock domains.
pub fn lock_name(discriminator: u32) -> String {
    format!("tidemark-{discriminator}")
}

/// Runs a unit of work while holding an exclusive lock.
///
/// Locks are not reentrant: nesting `execute` on the same lock domain blocks
/// until the wait ceiling and then fails.
pub trait ExclusiveLock {
    fn execute<T, E, F>(&self, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<DbError>;
}

/// A statement issued while acquiring or releasing a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStatement {
    pub sql: String,
    /// Whether the lock name is bound as the single positional parameter
    pub binds_lock_name: bool,
}

impl LockStatement {
    /// A statement taking the lock name as its parameter.
    pub fn with_lock_name(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds_lock_name: true,
        }
    }

    /// A statement without parameters.
    pub fn plain(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds_lock_name: false,
        }
    }
}

/// Vendor-specific SQL for a session-scoped exclusive lock.
pub trait LockStatements {
    /// Statements that block until the lock is held or `timeout` elapses.
    fn acquire(&self, timeout: Duration) -> Vec<LockStatement>;

    /// Statements that release the lock.
    fn release(&self) -> Vec<LockStatement>;
}

/// SQL Server application locks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerAppLock;

impl LockStatements for SqlServerAppLock {
    fn acquire(&self, timeout: Duration) -> Vec<LockStatement> {
        vec![LockStatement::with_lock_name(format!(
            "EXEC sp_getapplock @Resource = ?, @LockTimeout = '{}', \
             @LockMode = 'Exclusive', @LockOwner = 'Session'",
            timeout.as_millis()
        ))]
    }

    fn release(&self) -> Vec<LockStatement> {
        vec![LockStatement::with_lock_name(
            "EXEC sp_releaseapplock @Resource = ?, @LockOwner = 'Session'",
        )]
    }
}

/// PostgreSQL session-level advisory locks, keyed by a hash of the lock name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAdvisoryLock;

impl LockStatements for PostgresAdvisoryLock {
    fn acquire(&self, timeout: Duration) -> Vec<LockStatement> {
        vec![
            LockStatement::plain(format!("SET lock_timeout = '{}ms'", timeout.as_millis())),
            LockStatement::with_lock_name("SELECT pg_advisory_lock(hashtext(?))"),
            LockStatement::plain("RESET lock_timeout"),
        ]
    }

    fn release(&self) -> Vec<LockStatement> {
        vec![LockStatement::with_lock_name(
            "SELECT pg_advisory_unlock(hashtext(?))",
        )]
    }
}

/// Brackets units of work with a named database lock.
pub struct LockCoordinator<'a, X: SqlExecutor + ?Sized, S: LockStatements> {
    executor: &'a X,
    database: String,
    lock_name: String,
    timeout: Duration,
    statements: S,
}

impl<'a, X: SqlExecutor + ?Sized, S: LockStatements> LockCoordinator<'a, X, S> {
    /// Create a coordinator for `database` in the lock domain `discriminator`.
    pub fn new(executor: &'a X, database: impl Into<String>, discriminator: u32, statements: S) -> Self {
        Self {
            executor,
            database: database.into(),
            lock_name: lock_name(discriminator),
            timeout: DEFAULT_LOCK_TIMEOUT,
            statements,
        }
    }

    /// Create a coordinator from the `database` and `lock` settings.
    ///
    /// Server databases need an explicit `database.name` to select before
    /// locking.
    pub fn from_config(executor: &'a X, config: &TidemarkConfig, statements: S) -> DbResult<Self> {
        let database = config.database.name.clone().ok_or_else(|| {
            DbError::ConnectionError(
                "database.name must be set to take an advisory lock".to_string(),
            )
        })?;
        Ok(Self::new(executor, database, config.lock.discriminator, statements)
            .with_timeout(config.lock_timeout()))
    }

    /// Override the lock wait ceiling.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The name of the lock this coordinator takes.
    pub fn lock_name(&self) -> &str {
        &self.lock_name
    }

    /// Select the database and take the lock.
    ///
    /// The lock is held until the returned guard is dropped. The acquire
    /// statement binding the lock name is the one that takes the lock; if a
    /// later statement fails, the lock is released before the error is
    /// returned.
    pub fn acquire(&self) -> DbResult<LockGuard<'_, 'a, X, S>> {
        log::debug!("Acquiring lock {} on {}", self.lock_name, self.database);
        let mut guard = None;
        let result = self.executor.use_database(&self.database).and_then(|()| {
            for statement in self.statements.acquire(self.timeout) {
                self.run_statement(&statement)?;
                if statement.binds_lock_name && guard.is_none() {
                    guard = Some(LockGuard { coordinator: self });
                }
            }
            Ok(())
        });

        match result {
            Ok(()) => Ok(guard.unwrap_or(LockGuard { coordinator: self })),
            Err(e) => {
                if guard.is_some() {
                    log::warn!(
                        "Lock {} was taken but acquisition failed; releasing it",
                        self.lock_name
                    );
                }
                drop(guard);
                Err(DbError::LockAcquisition {
                    lock_name: self.lock_name.clone(),
                    source: Box::new(e),
                })
            }
        }
    }

    fn release(&self) -> DbResult<()> {
        log::debug!("Releasing lock {} on {}", self.lock_name, self.database);
        self.run(&self.statements.release())
    }

    fn run(&self, statements: &[LockStatement]) -> DbResult<()> {
        self.executor.use_database(&self.database)?;
        for statement in statements {
            self.run_statement(statement)?;
        }
        Ok(())
    }

    fn run_statement(&self, statement: &LockStatement) -> DbResult<()> {
        if statement.binds_lock_name {
            self.executor
                .execute(&statement.sql, &[self.lock_name.as_str()])
        } else {
            self.executor.execute(&statement.sql, &[])
        }
    }
}

impl<X: SqlExecutor + ?Sized, S: LockStatements> ExclusiveLock for LockCoordinator<'_, X, S> {
    fn execute<T, E, F>(&self, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<DbError>,
    {
        let _guard = self.acquire()?;
        action()
    }
}

/// Holds a database lock; releases it on drop.
///
/// A failed release is logged and never surfaces to the caller.
pub struct LockGuard<'l, 'a, X: SqlExecutor + ?Sized, S: LockStatements> {
    coordinator: &'l LockCoordinator<'a, X, S>,
}

impl<X: SqlExecutor + ?Sized, S: LockStatements> Drop for LockGuard<'_, '_, X, S> {
    fn drop(&mut self) {
        if let Err(e) = self.coordinator.release() {
            log::error!(
                "Unable to release lock {}: {e}",
                self.coordinator.lock_name
            );
        }
    }
}

type LockRegistry = Mutex<HashMap<String, Arc<Mutex<()>>>>;

fn process_locks() -> &'static LockRegistry {
    static LOCKS: OnceLock<LockRegistry> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// In-process named lock for embedded databases.
///
/// All `ProcessLock`s created with the same name share one mutex.
#[derive(Debug, Clone)]
pub struct ProcessLock {
    name: String,
    mutex: Arc<Mutex<()>>,
    timeout: Duration,
}

impl ProcessLock {
    /// The process-wide lock called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let mutex = process_locks()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.clone())
            .or_default()
            .clone();
        Self {
            name,
            mutex,
            timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// The process-wide lock for a discriminator.
    pub fn for_discriminator(discriminator: u32) -> Self {
        Self::named(lock_name(discriminator))
    }

    /// Override the lock wait ceiling.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The name of this lock.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ExclusiveLock for ProcessLock {
    fn execute<T, E, F>(&self, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<DbError>,
    {
        let deadline = Instant::now() + self.timeout;
        let _guard = loop {
            match self.mutex.try_lock() {
                Ok(guard) => break guard,
                // The mutex guards no data, so a panic in a previous holder
                // leaves nothing inconsistent.
                Err(TryLockError::Poisoned(poisoned)) => break poisoned.into_inner(),
                Err(TryLockError::WouldBlock) if Instant::now() < deadline => {
                    std::thread::sleep(PROCESS_LOCK_POLL);
                }
                Err(TryLockError::WouldBlock) => {
                    return Err(E::from(DbError::LockAcquisition {
                        lock_name: self.name.clone(),
                        source: Box::new(DbError::ExecutionError(format!(
                            "timed out after {:?}",
                            self.timeout
                        ))),
                    }));
                }
            }
        };
        log::debug!("Acquired process lock {}", self.name);
        action()
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
