//! Domain types shared by the indexing and search-and-answer pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type DocId = String;

/// Index field names. The engine adapter maps these onto its own schema;
/// the planner and negotiator refer to them when requesting highlights.
pub mod field {
    pub const FILENAME: &str = "filename";
    pub const DOC_TYPE: &str = "doc_type";
    pub const CONTENT: &str = "content";
    pub const SUMMARY: &str = "summary";
    pub const KEYWORDS: &str = "keywords";
    pub const TAGS: &str = "tags";
    pub const FILE_PATH: &str = "file_path";
}

/// A parsed document as written to the search engine.
///
/// Owned by the Indexer once written; immutable afterwards except for an
/// explicit re-index of the same `id`. `tags` carry exact-match semantics
/// and are never tokenized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocId,
    pub filename: String,
    pub doc_type: String,
    pub content: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub tags: BTreeSet<String>,
    pub metadata: BTreeMap<String, String>,
    /// Unix timestamp (seconds) set by the Indexer at write time.
    pub indexed_at: u64,
    pub file_size: u64,
    pub file_path: String,
}

impl DocumentRecord {
    /// Stored text of a single-valued field, by index field name.
    pub fn text_of(&self, name: &str) -> Option<&str> {
        match name {
            field::FILENAME => Some(&self.filename),
            field::DOC_TYPE => Some(&self.doc_type),
            field::CONTENT => Some(&self.content),
            field::SUMMARY => Some(&self.summary),
            field::FILE_PATH => Some(&self.file_path),
            _ => None,
        }
    }

    /// Values of a multi-valued field, by index field name.
    pub fn terms_of(&self, name: &str) -> Vec<&str> {
        match name {
            field::KEYWORDS => self.keywords.iter().map(String::as_str).collect(),
            field::TAGS => self.tags.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Output of a parser collaborator, before the Indexer stamps identity,
/// timestamp and file provenance onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub doc_type: String,
    pub content: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

/// How a field is indexed.
///
/// `Keyword` supports equality filters and frequency aggregation; `Text`
/// is analyzed for full-text matching. The `tags` field must be `Keyword`
/// (the invariant that makes schema migration necessary at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Keyword,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Text => write!(f, "text"),
            FieldKind::Keyword => write!(f, "keyword"),
        }
    }
}

/// The schema describing each indexed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub fields: Vec<(String, FieldKind)>,
}

impl Mapping {
    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, k)| *k)
    }

    /// The mapping every new index is created with.
    pub fn current() -> Self {
        Mapping {
            fields: vec![
                (field::FILENAME.to_string(), FieldKind::Text),
                (field::DOC_TYPE.to_string(), FieldKind::Keyword),
                (field::CONTENT.to_string(), FieldKind::Text),
                (field::SUMMARY.to_string(), FieldKind::Text),
                (field::KEYWORDS.to_string(), FieldKind::Keyword),
                (field::TAGS.to_string(), FieldKind::Keyword),
                (field::FILE_PATH.to_string(), FieldKind::Keyword),
            ],
        }
    }

    /// The historical mapping with analyzed `tags`, kept for migration
    /// tests and for recognizing drifted live indices.
    pub fn legacy_text_tags() -> Self {
        let mut mapping = Self::current();
        for (name, kind) in &mut mapping.fields {
            if name == field::TAGS {
                *kind = FieldKind::Text;
            }
        }
        mapping
    }
}

/// A generation counter plus the mapping it describes. The generation
/// feeds the concrete index name behind the alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub generation: u64,
    pub mapping: Mapping,
}

impl SchemaVersion {
    pub fn initial() -> Self {
        SchemaVersion {
            generation: 1,
            mapping: Mapping::current(),
        }
    }

    pub fn next(&self, mapping: Mapping) -> Self {
        SchemaVersion {
            generation: self.generation + 1,
            mapping,
        }
    }
}

/// A full-text field with its relevance boost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldBoost {
    pub field: String,
    pub boost: f32,
}

/// Which fields to highlight and the engine-side analyzed-offset limit
/// the adapter must respect before attempting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightSpec {
    pub fields: Vec<String>,
    pub max_analyzed_offset: usize,
    pub fragment_chars: usize,
}

/// A structured, weighted multi-field search request built by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub fields: Vec<FieldBoost>,
    /// Exact-match filter; every listed tag must be present on a hit.
    pub tag_filter: BTreeSet<String>,
    pub size: usize,
    pub fuzzy: bool,
    pub highlight: HighlightSpec,
}

/// One ranked result. Carries the stored display fields so downstream
/// stages (negotiator, synthesizer) need no further lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocId,
    /// Engine-defined scale; higher is more relevant.
    pub score: f32,
    pub filename: String,
    pub doc_type: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub tags: BTreeSet<String>,
    /// Field name -> highlighted snippets, in rank order. May be empty.
    pub highlights: BTreeMap<String, Vec<String>>,
}

/// The input to answer synthesis: the query as asked and the hits as
/// returned, score-descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchContext {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub size: usize,
}

/// A synthesized, confidence-scored answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    /// In [0, 1]; below the assertive threshold the answer presents a
    /// candidate list instead of asserting a single source.
    pub confidence: f32,
    pub sources: Vec<DocId>,
    /// Deterministic exploration path: restate, top source, excerpt,
    /// confidence, next steps.
    pub flow: Vec<String>,
    pub suggestions: Vec<String>,
}
