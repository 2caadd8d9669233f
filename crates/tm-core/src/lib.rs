//! tm-core - Core library for Tidemark
//!
//! This crate provides the types shared by every Tidemark component:
//! migration locations and their wildcard matching, versions, the migration
//! type registry, lifecycle events, configuration parsing, and the backoff
//! and retry helpers used around database access.

pub mod backoff;
pub mod config;
pub mod error;
pub mod event;
pub mod location;
pub mod migration_type;
pub mod retry;
pub mod scanner;
pub mod version;

pub use backoff::Backoff;
pub use config::{DatabaseConfig, LockConfig, RetryConfig, TidemarkConfig};
pub use error::{CoreError, CoreResult};
pub use event::{Event, EventSink, LogEventSink, NoopEventSink};
pub use location::{Location, LocationScheme};
pub use migration_type::{MigrationType, MigrationTypeFlags, MigrationTypeRegistry};
pub use retry::RetryPolicy;
pub use scanner::{scan_filesystem, ScannedResource};
pub use version::MigrationVersion;
