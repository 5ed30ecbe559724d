use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{DocumentRecord, ParsedDocument, SchemaVersion, SearchContext, SearchHit, SearchRequest};

/// The search engine collaborator.
///
/// `target` is either an alias or a concrete index name; aliases resolve
/// to exactly one concrete index at any instant, which is what makes the
/// migration swap atomic from a reader's viewpoint.
///
/// Implementations must classify the "field too long for highlighting"
/// condition as `Error::FieldLengthExceeded` so the negotiator can react
/// to the typed error rather than to engine message text.
pub trait SearchEngine: Send + Sync {
    fn create_index(&self, name: &str, schema: &SchemaVersion) -> Result<()>;
    fn delete_index(&self, name: &str) -> Result<()>;
    fn get_schema(&self, target: &str) -> Result<SchemaVersion>;

    fn put(&self, target: &str, record: &DocumentRecord) -> Result<()>;
    fn bulk_put(&self, target: &str, records: &[DocumentRecord]) -> Result<()>;
    fn get(&self, target: &str, id: &str) -> Result<DocumentRecord>;
    fn delete(&self, target: &str, id: &str) -> Result<()>;
    fn count(&self, target: &str) -> Result<u64>;

    fn search(&self, target: &str, request: &SearchRequest) -> Result<Vec<SearchHit>>;

    /// Stream every document of `target` to `sink` in batches of `batch`.
    /// Used by migration's copy phase; no ordering guarantee.
    fn scroll(
        &self,
        target: &str,
        batch: usize,
        sink: &mut dyn FnMut(&[DocumentRecord]) -> Result<()>,
    ) -> Result<()>;

    fn resolve_alias(&self, alias: &str) -> Result<Option<String>>;
    /// Point `alias` at `index` only if the alias does not exist yet.
    fn ensure_alias(&self, alias: &str, index: &str) -> Result<()>;
    /// Atomically repoint `alias` at `index`.
    fn swap_alias(&self, alias: &str, index: &str) -> Result<()>;

    /// Frequency aggregation over an exact-match (keyword) field.
    fn term_counts(&self, target: &str, field: &str) -> Result<BTreeMap<String, u64>>;

    fn tag_counts(&self, target: &str) -> Result<BTreeMap<String, u64>> {
        self.term_counts(target, crate::types::field::TAGS)
    }
}

/// Turns raw file bytes into text plus metadata. A failure is isolated to
/// the one file and must not abort a batch of otherwise-valid files.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument>;
}

/// Optional language-generation collaborator. Best-effort prose only:
/// confidence, sources and flow are always computed locally, and any
/// failure here falls back to the locally synthesized answer.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, context: &SearchContext) -> anyhow::Result<String>;
}
