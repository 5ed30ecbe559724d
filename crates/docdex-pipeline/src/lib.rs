//! docdex-pipeline
//!
//! The caller-facing facade: one explicit service object constructed at
//! process start, holding the engine client and configuration, passed to
//! every pipeline stage. Also hosts the extension-keyed parser registry
//! used by directory ingestion.

pub mod parse;
pub mod service;

pub use parse::ParserRegistry;
pub use service::{DocdexService, IngestReport, SearchResponse, Stats};
