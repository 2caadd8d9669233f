//! Fixed-delay retry policy for blocking operations.

use std::fmt;
use std::time::Duration;

/// How many times to attempt an operation and how long to pause in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Ten attempts, one second apart.
    pub const SCHEMA_CREATION: RetryPolicy = RetryPolicy {
        max_attempts: 10,
        delay: Duration::from_secs(1),
    };

    /// Create a policy.
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
    /// or the attempts are exhausted.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// unchanged. Sleeps on the calling thread between attempts.
    pub fn run<T, E, F, R>(&self, mut op: F, is_retryable: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        R: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max_attempts || !is_retryable(&err) => return Err(err),
                Err(err) => {
                    log::debug!(
                        "Attempt {attempt}/{max_attempts} failed: {err}. Retrying in {:?} ...",
                        self.delay
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::SCHEMA_CREATION
    }
}
