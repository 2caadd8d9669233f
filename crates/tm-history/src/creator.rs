//! Creation of the schemas Tidemark manages.

use crate::error::{HistoryError, HistoryResult};
use crate::history::{add_schemas_marker, SchemaHistory};
use tm_core::{Event, EventSink, RetryPolicy, TidemarkConfig};
use tm_db::{Schema, TransactionRunner};

/// Creates missing managed schemas and records them in the ledger.
///
/// Each attempt runs in one transaction: either every missing schema is
/// created together with the ledger and its marker row, or nothing is.
pub struct SchemaCreator<'a, T: TransactionRunner, H: SchemaHistory> {
    transactions: &'a T,
    schemas: Vec<Box<dyn Schema + 'a>>,
    history: &'a H,
    events: &'a dyn EventSink,
    retry: RetryPolicy,
    enabled: bool,
}

impl<'a, T: TransactionRunner, H: SchemaHistory> SchemaCreator<'a, T, H> {
    pub fn new(
        transactions: &'a T,
        schemas: Vec<Box<dyn Schema + 'a>>,
        history: &'a H,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            transactions,
            schemas,
            history,
            events,
            retry: RetryPolicy::SCHEMA_CREATION,
            enabled: true,
        }
    }

    /// Apply the `create_schemas` switch and the `schema_creation` retry
    /// policy from configuration.
    pub fn with_config(self, config: &TidemarkConfig) -> Self {
        self.with_retry(config.schema_creation_policy())
            .with_create_schemas(config.create_schemas)
    }

    /// When disabled, `create` leaves missing schemas alone.
    pub fn with_create_schemas(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the default ten-attempt, one-second retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create every managed schema that does not exist yet.
    ///
    /// When at least one schema is created the ledger is created too, with a
    /// baseline row if `baseline` is set, followed by a marker row naming the
    /// new schemas. Configuration errors fail immediately; other failures
    /// are retried and the last one is returned unchanged.
    pub fn create(&self, baseline: bool) -> HistoryResult<()> {
        if !self.enabled {
            log::warn!("Schema creation is disabled; missing schemas will not be created");
            return Ok(());
        }

        self.events.on_event(Event::CreateSchema);
        self.events.on_event(Event::BeforeCreateSchema);

        self.retry.run(
            |attempt| {
                log::debug!("Schema creation attempt {attempt}");
                self.transactions
                    .in_transaction(|| self.create_missing(baseline))
                    .inspect_err(|_| self.history.clear_cache())
            },
            HistoryError::is_retryable,
        )
    }

    fn create_missing(&self, baseline: bool) -> HistoryResult<()> {
        let mut created: Vec<&dyn Schema> = Vec::new();
        for schema in &self.schemas {
            if schema.exists()? {
                log::debug!("Skipping creation of existing schema: {}", schema.quoted_name());
                continue;
            }
            if schema.name().is_none() {
                return Err(HistoryError::Configuration(
                    "Unable to determine schema for the schema history table. \
                     Set a default schema for the connection or specify one using the default_schema property!"
                        .to_string(),
                ));
            }
            log::debug!("Creating schema: {}", schema.quoted_name());
            schema.create()?;
            created.push(&**schema);
        }

        if !created.is_empty() {
            self.history.create(baseline)?;
            add_schemas_marker(self.history, &created)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "creator_test.rs"]
mod tests;
