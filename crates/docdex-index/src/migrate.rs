use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use docdex_core::config::IndexConfig;
use docdex_core::error::{Error, Result};
use docdex_core::traits::SearchEngine;
use docdex_core::types::Mapping;

/// Outcome of a completed migration.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub from: String,
    pub to: String,
    pub documents: u64,
    pub elapsed: Duration,
}

/// Upgrades the index mapping behind an alias without read downtime.
///
/// Protocol: create the next-generation index, copy every document over in
/// batches, verify the destination count, and only then atomically repoint
/// the alias. The old index stays authoritative until the swap and is
/// deleted only afterwards; a failure in the copy or verify step removes
/// the half-built index and reports `MigrationFailed` with the old schema
/// still serving reads.
pub struct SchemaMigrator {
    engine: Arc<dyn SearchEngine>,
    batch: usize,
    timeout: Duration,
}

impl SchemaMigrator {
    pub fn new(engine: Arc<dyn SearchEngine>, cfg: &IndexConfig) -> Self {
        SchemaMigrator {
            engine,
            batch: cfg.scroll_batch,
            timeout: Duration::from_secs(cfg.migration_timeout_secs),
        }
    }

    pub fn migrate(&self, alias: &str, target: Mapping) -> Result<MigrationReport> {
        let started = Instant::now();
        let old = self.engine.resolve_alias(alias)?.ok_or_else(|| Error::MigrationFailed {
            step: "resolve".to_string(),
            reason: format!("alias '{}' does not exist", alias),
        })?;
        let old_schema = self.engine.get_schema(&old)?;
        let next = old_schema.next(target);
        let new = format!("{}-g{:06}", alias, next.generation);

        info!(alias = alias, from = old.as_str(), to = new.as_str(), "starting migration");
        self.engine.create_index(&new, &next)?;

        match self.copy_and_verify(&old, &new, started) {
            Ok(documents) => {
                // Single atomic step; readers see either the old or the new
                // index, never neither.
                self.engine.swap_alias(alias, &new)?;
                if let Err(e) = self.engine.delete_index(&old) {
                    warn!(index = old.as_str(), error = %e, "old index left behind after swap");
                }
                let report = MigrationReport {
                    from: old,
                    to: new,
                    documents,
                    elapsed: started.elapsed(),
                };
                info!(
                    documents = report.documents,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "migration complete"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "migration failed; old index remains authoritative");
                if let Err(cleanup) = self.engine.delete_index(&new) {
                    warn!(index = new.as_str(), error = %cleanup, "failed to remove half-built index");
                }
                Err(e)
            }
        }
    }

    fn copy_and_verify(&self, old: &str, new: &str, started: Instant) -> Result<u64> {
        let deadline = started + self.timeout;
        let engine = Arc::clone(&self.engine);
        let new_name = new.to_string();
        self.engine
            .scroll(old, self.batch, &mut |records| {
                if Instant::now() > deadline {
                    return Err(Error::MigrationFailed {
                        step: "copy".to_string(),
                        reason: "timed out".to_string(),
                    });
                }
                engine.bulk_put(&new_name, records)
            })
            .map_err(|e| match e {
                Error::MigrationFailed { .. } => e,
                other => Error::MigrationFailed {
                    step: "copy".to_string(),
                    reason: other.to_string(),
                },
            })?;

        let source = self.engine.count(old)?;
        let destination = self.engine.count(new)?;
        if source != destination {
            return Err(Error::MigrationFailed {
                step: "verify".to_string(),
                reason: format!("source has {} documents, destination {}", source, destination),
            });
        }
        Ok(destination)
    }
}
