use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use docdex_core::config::IndexConfig;
use docdex_core::error::{Error, Result};
use docdex_core::traits::SearchEngine;
use docdex_core::types::{field, DocumentRecord, FieldKind, Mapping, SchemaVersion};

use crate::migrate::SchemaMigrator;

/// Write-side owner of DocumentRecords.
///
/// On construction it bootstraps the alias when missing, then compares the
/// live mapping's `tags` kind against the required exact-match kind; a
/// drifted index is migrated synchronously before the first write is
/// accepted. Transient engine failures are retried with doubling backoff.
pub struct Indexer {
    engine: Arc<dyn SearchEngine>,
    alias: String,
    max_attempts: u32,
    backoff: Duration,
}

impl Indexer {
    pub fn new(engine: Arc<dyn SearchEngine>, alias: &str, cfg: &IndexConfig) -> Result<Self> {
        let indexer = Indexer {
            engine,
            alias: alias.to_string(),
            max_attempts: cfg.max_attempts.max(1),
            backoff: Duration::from_millis(cfg.backoff_ms),
        };
        indexer.ensure_ready(cfg)?;
        Ok(indexer)
    }

    /// Bootstrap or migrate so that the alias points at an index whose
    /// `tags` field supports exact matching and aggregation.
    fn ensure_ready(&self, cfg: &IndexConfig) -> Result<()> {
        match self.engine.resolve_alias(&self.alias)? {
            None => {
                let initial = SchemaVersion::initial();
                let name = format!("{}-g{:06}", self.alias, initial.generation);
                self.engine.create_index(&name, &initial)?;
                self.engine.ensure_alias(&self.alias, &name)?;
                info!(alias = self.alias.as_str(), index = name.as_str(), "bootstrapped index");
                Ok(())
            }
            Some(_) => {
                let live = self.engine.get_schema(&self.alias)?;
                let actual = live.mapping.kind_of(field::TAGS);
                if actual == Some(FieldKind::Keyword) {
                    return Ok(());
                }
                warn!(
                    alias = self.alias.as_str(),
                    actual = ?actual,
                    "tags mapping drifted; migrating before accepting writes"
                );
                let migrator = SchemaMigrator::new(Arc::clone(&self.engine), cfg);
                migrator.migrate(&self.alias, Mapping::current())?;
                Ok(())
            }
        }
    }

    /// Write or replace a record by id. Stamps the indexing timestamp.
    pub fn upsert(&self, record: &DocumentRecord) -> Result<String> {
        let mut stamped = record.clone();
        stamped.indexed_at = unix_now();
        self.with_retry("upsert", || self.engine.put(&self.alias, &stamped))
            .map_err(|e| match e {
                // Retries exhausted or unrecoverable: surface as a write
                // failure carrying the document id.
                Error::Transient { reason } => Error::IndexWrite { id: record.id.clone(), reason },
                Error::Engine(source) => Error::IndexWrite {
                    id: record.id.clone(),
                    reason: source.to_string(),
                },
                other => other,
            })?;
        Ok(stamped.id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.with_retry("delete", || self.engine.delete(&self.alias, id))
    }

    pub fn get(&self, id: &str) -> Result<DocumentRecord> {
        self.engine.get(&self.alias, id)
    }

    fn with_retry<T>(&self, op: &str, mut call: impl FnMut() -> Result<T>) -> Result<T> {
        let mut backoff = self.backoff;
        let mut attempt = 1;
        loop {
            match call() {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        op = op,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "transient engine error; retrying"
                    );
                    std::thread::sleep(backoff);
                    backoff *= 2;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
