//! docdex-index
//!
//! Write-side orchestration: the Indexer (upsert/delete/get with bounded
//! retry and schema-drift detection) and the SchemaMigrator (aliasing
//! reindex with no read downtime).

pub mod indexer;
pub mod migrate;

pub use indexer::Indexer;
pub use migrate::{MigrationReport, SchemaMigrator};
