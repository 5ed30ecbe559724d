use tantivy::schema::{
    IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

use docdex_core::types::{FieldKind, Mapping};

/// Internal fields every index carries regardless of the mapping.
pub const ID_FIELD: &str = "id";
pub const SOURCE_FIELD: &str = "_source";

pub const TOKENIZER_NAME: &str = "docdex_text";

/// Build a tantivy schema from a mapping. `Text` fields are analyzed and
/// stored (snippet generation reads the stored value); `Keyword` fields are
/// indexed raw so they support exact-match filters and term aggregation.
/// The whole record is additionally stored as JSON under `_source` so that
/// reads round-trip byte-identically.
pub fn build_schema(mapping: &Mapping) -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field(ID_FIELD, STRING | STORED);

    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default()
        .set_indexing_options(text_field_indexing)
        .set_stored();

    for (name, kind) in &mapping.fields {
        match kind {
            FieldKind::Text => {
                schema_builder.add_text_field(name, text_options.clone());
            }
            FieldKind::Keyword => {
                schema_builder.add_text_field(name, STRING | STORED);
            }
        }
    }

    schema_builder.add_text_field(SOURCE_FIELD, TextOptions::default().set_stored());
    schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
    let stop_words = vec![
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "or", "but", "not",
        "this", "these", "they", "them", "their", "there", "then", "than", "so", "if", "when",
        "where", "why", "how", "what", "which", "who", "whom", "whose", "can", "could", "should",
        "would", "may", "might", "must", "shall", "do", "does", "did", "have", "had", "having",
    ];
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(
            stop_words.into_iter().map(|s| s.to_string()),
        ))
        .build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
