//! Error types for tm-core

use thiserror::Error;

/// Core error type for Tidemark
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Location descriptor uses a scheme other than classpath, filesystem, s3 or gcs
    #[error("[C004] Unknown prefix for location (should be one of filesystem:, classpath:, gcs:, or s3:): {descriptor}")]
    UnknownLocationPrefix { descriptor: String },

    /// C005: Wildcard location could not be compiled into a matcher
    #[error("[C005] Invalid wildcard pattern in location '{descriptor}': {reason}")]
    InvalidLocationPattern { descriptor: String, reason: String },

    /// C006: Migration version string is not a dotted/underscored number sequence
    #[error("[C006] Invalid migration version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// C007: A migration type with the same name is already registered
    #[error("[C007] Migration type '{name}' is already registered")]
    DuplicateMigrationType { name: String },

    /// C008: IO error with file path context
    #[error("[C008] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

impl CoreError {
    /// Whether this error stems from user configuration rather than the environment.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, CoreError::IoWithPath { .. })
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
