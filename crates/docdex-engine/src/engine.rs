use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Schema, Value};
use tantivy::snippet::SnippetGenerator;
use tantivy::{DocAddress, Index, TantivyDocument, TantivyError, Term};
use tracing::{debug, info};

use docdex_core::config::{expand_path, EngineConfig};
use docdex_core::error::{Error, Result};
use docdex_core::traits::SearchEngine;
use docdex_core::types::{field, DocumentRecord, FieldKind, SchemaVersion, SearchHit, SearchRequest};

use crate::alias::AliasStore;
use crate::mapping::{build_schema, register_tokenizer, ID_FIELD, SOURCE_FIELD};

const MAPPING_FILE: &str = "mapping.json";

/// Embedded tantivy implementation of the `SearchEngine` collaborator.
///
/// Layout under the data directory:
///   indices/<name>/         tantivy index + mapping.json
///   aliases.json            alias -> concrete index name
pub struct TantivyEngine {
    root: PathBuf,
    writer_heap: usize,
    aliases: AliasStore,
}

impl TantivyEngine {
    pub fn new(cfg: &EngineConfig) -> Result<Self> {
        let root = expand_path(&cfg.data_dir);
        fs::create_dir_all(root.join("indices"))
            .map_err(|e| Error::Transient { reason: format!("creating data dir: {}", e) })?;
        let aliases = AliasStore::new(root.join("aliases.json"));
        Ok(TantivyEngine { root, writer_heap: cfg.writer_heap_bytes, aliases })
    }

    fn index_dir(&self, name: &str) -> PathBuf {
        self.root.join("indices").join(name)
    }

    /// Resolve `target` through the alias store; a name with no alias entry
    /// is treated as a concrete index name.
    fn resolve(&self, target: &str) -> Result<String> {
        let name = match self.aliases.get(target)? {
            Some(concrete) => concrete,
            None => target.to_string(),
        };
        if !self.index_dir(&name).join(MAPPING_FILE).exists() {
            return Err(anyhow::anyhow!("unknown index or alias '{}'", target).into());
        }
        Ok(name)
    }

    fn open_index(&self, name: &str) -> Result<(Index, SchemaVersion)> {
        let dir = self.index_dir(name);
        let index = Index::open_in_dir(&dir).map_err(classify)?;
        register_tokenizer(&index);
        let raw = fs::read_to_string(dir.join(MAPPING_FILE))
            .map_err(|e| Error::Transient { reason: format!("reading mapping: {}", e) })?;
        let schema_version: SchemaVersion = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("mapping for '{}' is corrupt: {}", name, e))?;
        Ok((index, schema_version))
    }

    fn write_batch(&self, name: &str, records: &[DocumentRecord]) -> Result<()> {
        let (index, schema_version) = self.open_index(name)?;
        let schema = index.schema();
        let id_field = schema.get_field(ID_FIELD).map_err(classify)?;
        let mut writer = index.writer(self.writer_heap).map_err(classify)?;
        for record in records {
            writer.delete_term(Term::from_field_text(id_field, &record.id));
            let doc = record_to_doc(&schema, &schema_version, record)?;
            writer.add_document(doc).map_err(classify)?;
        }
        writer.commit().map_err(classify)?;
        Ok(())
    }

    fn fetch_by_id(&self, name: &str, id: &str) -> Result<Option<DocumentRecord>> {
        let (index, _) = self.open_index(name)?;
        let schema = index.schema();
        let id_field = schema.get_field(ID_FIELD).map_err(classify)?;
        let reader = index.reader().map_err(classify)?;
        let searcher = reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(id_field, id),
            IndexRecordOption::Basic,
        );
        let top = searcher
            .search(&query, &TopDocs::with_limit(1))
            .map_err(classify)?;
        match top.first() {
            Some((_, addr)) => {
                let doc: TantivyDocument = searcher.doc(*addr).map_err(classify)?;
                Ok(Some(source_record(&schema, &doc)?))
            }
            None => Ok(None),
        }
    }
}

impl SearchEngine for TantivyEngine {
    fn create_index(&self, name: &str, schema_version: &SchemaVersion) -> Result<()> {
        let dir = self.index_dir(name);
        if dir.exists() {
            return Err(anyhow::anyhow!("index '{}' already exists", name).into());
        }
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Transient { reason: format!("creating index dir: {}", e) })?;
        let index = Index::create_in_dir(&dir, build_schema(&schema_version.mapping))
            .map_err(classify)?;
        register_tokenizer(&index);
        let raw = serde_json::to_string_pretty(schema_version)
            .map_err(|e| anyhow::anyhow!("serializing mapping: {}", e))?;
        fs::write(dir.join(MAPPING_FILE), raw)
            .map_err(|e| Error::Transient { reason: format!("writing mapping: {}", e) })?;
        info!(index = name, generation = schema_version.generation, "created index");
        Ok(())
    }

    fn delete_index(&self, name: &str) -> Result<()> {
        let dir = self.index_dir(name);
        if !dir.exists() {
            return Err(Error::NotFound { id: name.to_string() });
        }
        fs::remove_dir_all(&dir)
            .map_err(|e| Error::Transient { reason: format!("deleting index: {}", e) })?;
        info!(index = name, "deleted index");
        Ok(())
    }

    fn get_schema(&self, target: &str) -> Result<SchemaVersion> {
        let name = self.resolve(target)?;
        let (_, schema_version) = self.open_index(&name)?;
        Ok(schema_version)
    }

    fn put(&self, target: &str, record: &DocumentRecord) -> Result<()> {
        let name = self.resolve(target)?;
        self.write_batch(&name, std::slice::from_ref(record))
    }

    fn bulk_put(&self, target: &str, records: &[DocumentRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let name = self.resolve(target)?;
        self.write_batch(&name, records)
    }

    fn get(&self, target: &str, id: &str) -> Result<DocumentRecord> {
        let name = self.resolve(target)?;
        self.fetch_by_id(&name, id)?
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    fn delete(&self, target: &str, id: &str) -> Result<()> {
        let name = self.resolve(target)?;
        if self.fetch_by_id(&name, id)?.is_none() {
            return Err(Error::NotFound { id: id.to_string() });
        }
        let (index, _) = self.open_index(&name)?;
        let id_field = index.schema().get_field(ID_FIELD).map_err(classify)?;
        let mut writer: tantivy::IndexWriter<TantivyDocument> =
            index.writer(self.writer_heap).map_err(classify)?;
        writer.delete_term(Term::from_field_text(id_field, id));
        writer.commit().map_err(classify)?;
        Ok(())
    }

    fn count(&self, target: &str) -> Result<u64> {
        let name = self.resolve(target)?;
        let (index, _) = self.open_index(&name)?;
        let reader = index.reader().map_err(classify)?;
        let count = reader
            .searcher()
            .search(&tantivy::query::AllQuery, &Count)
            .map_err(classify)?;
        Ok(count as u64)
    }

    fn search(&self, target: &str, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let name = self.resolve(target)?;
        let (index, schema_version) = self.open_index(&name)?;
        let schema = index.schema();
        let reader = index.reader().map_err(classify)?;
        let searcher = reader.searcher();

        let mut boosted = Vec::with_capacity(request.fields.len());
        for fb in &request.fields {
            let f = schema.get_field(&fb.field).map_err(classify)?;
            boosted.push((f, fb.boost));
        }
        let mut parser =
            QueryParser::for_index(&index, boosted.iter().map(|(f, _)| *f).collect());
        for (f, boost) in &boosted {
            parser.set_field_boost(*f, *boost);
        }
        if request.fuzzy {
            for (f, _) in &boosted {
                parser.set_field_fuzzy(*f, false, 1, true);
            }
        }
        let parsed = parser
            .parse_query(&request.query)
            .map_err(|e| Error::InvalidQuery(e.to_string()))?;

        let query: Box<dyn Query> = if request.tag_filter.is_empty() {
            parsed
        } else {
            require_keyword(&schema_version, field::TAGS)?;
            let tags_field = schema.get_field(field::TAGS).map_err(classify)?;
            let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, parsed)];
            for tag in &request.tag_filter {
                clauses.push((
                    Occur::Must,
                    Box::new(TermQuery::new(
                        Term::from_field_text(tags_field, tag),
                        IndexRecordOption::Basic,
                    )),
                ));
            }
            Box::new(BooleanQuery::new(clauses))
        };

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(request.size.max(1)))
            .map_err(classify)?;

        // Only analyzed text fields are eligible for snippet generation.
        let mut generators: Vec<(String, SnippetGenerator)> = Vec::new();
        for field_name in &request.highlight.fields {
            if schema_version.mapping.kind_of(field_name) != Some(FieldKind::Text) {
                continue;
            }
            let f = schema.get_field(field_name).map_err(classify)?;
            let mut generator =
                SnippetGenerator::create(&searcher, &*query, f).map_err(classify)?;
            generator.set_max_num_chars(request.highlight.fragment_chars);
            generators.push((field_name.clone(), generator));
        }

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr).map_err(classify)?;
            let record = source_record(&schema, &doc)?;

            let mut highlights: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (field_name, generator) in &generators {
                let stored_len = record.text_of(field_name).map_or(0, str::len);
                if stored_len > request.highlight.max_analyzed_offset {
                    // Typed classification the negotiator reacts to.
                    return Err(Error::FieldLengthExceeded { field: field_name.clone() });
                }
                let snippet = generator.snippet_from_doc(&doc);
                let html = snippet.to_html();
                if !html.is_empty() {
                    highlights.insert(field_name.clone(), vec![html]);
                }
            }

            hits.push(SearchHit {
                id: record.id.clone(),
                score,
                filename: record.filename.clone(),
                doc_type: record.doc_type.clone(),
                summary: record.summary.clone(),
                keywords: record.keywords.clone(),
                tags: record.tags.clone(),
                highlights,
            });
        }
        debug!(index = name.as_str(), hits = hits.len(), "search completed");
        Ok(hits)
    }

    fn scroll(
        &self,
        target: &str,
        batch: usize,
        sink: &mut dyn FnMut(&[DocumentRecord]) -> Result<()>,
    ) -> Result<()> {
        let name = self.resolve(target)?;
        let (index, _) = self.open_index(&name)?;
        let schema = index.schema();
        let reader = index.reader().map_err(classify)?;
        let searcher = reader.searcher();
        let addrs = searcher
            .search(&tantivy::query::AllQuery, &DocSetCollector)
            .map_err(classify)?;
        let mut addrs: Vec<DocAddress> = addrs.into_iter().collect();
        addrs.sort_by_key(|a| (a.segment_ord, a.doc_id));

        for chunk in addrs.chunks(batch.max(1)) {
            let mut records = Vec::with_capacity(chunk.len());
            for addr in chunk {
                let doc: TantivyDocument = searcher.doc(*addr).map_err(classify)?;
                records.push(source_record(&schema, &doc)?);
            }
            sink(&records)?;
        }
        Ok(())
    }

    fn resolve_alias(&self, alias: &str) -> Result<Option<String>> {
        self.aliases.get(alias)
    }

    fn ensure_alias(&self, alias: &str, index: &str) -> Result<()> {
        if self.aliases.get(alias)?.is_some() {
            return Ok(());
        }
        self.swap_alias(alias, index)
    }

    fn swap_alias(&self, alias: &str, index: &str) -> Result<()> {
        if !self.index_dir(index).join(MAPPING_FILE).exists() {
            return Err(anyhow::anyhow!(
                "cannot point alias '{}' at missing index '{}'",
                alias,
                index
            )
            .into());
        }
        self.aliases.set(alias, index)?;
        info!(alias = alias, index = index, "alias now points at index");
        Ok(())
    }

    fn term_counts(&self, target: &str, field_name: &str) -> Result<BTreeMap<String, u64>> {
        let name = self.resolve(target)?;
        let (index, schema_version) = self.open_index(&name)?;
        require_keyword(&schema_version, field_name)?;
        let agg_field = index.schema().get_field(field_name).map_err(classify)?;
        let reader = index.reader().map_err(classify)?;
        let searcher = reader.searcher();

        // The term dictionary enumerates terms, but its doc frequencies
        // still include deleted documents until a merge; count each term
        // with a query so only alive documents are tallied.
        let mut terms: Vec<String> = Vec::new();
        for segment in searcher.segment_readers() {
            let inverted = segment.inverted_index(agg_field).map_err(classify)?;
            let mut stream = inverted
                .terms()
                .stream()
                .map_err(|e| Error::Transient { reason: format!("streaming term dictionary: {}", e) })?;
            while stream.advance() {
                let term = String::from_utf8_lossy(stream.key()).into_owned();
                if !terms.contains(&term) {
                    terms.push(term);
                }
            }
        }

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for term in terms {
            let query = TermQuery::new(
                Term::from_field_text(agg_field, &term),
                IndexRecordOption::Basic,
            );
            let alive = searcher.search(&query, &Count).map_err(classify)?;
            if alive > 0 {
                counts.insert(term, alive as u64);
            }
        }
        Ok(counts)
    }
}

/// Exact-match filtering and term aggregation only make sense against a
/// keyword mapping; an analyzed field needs migration first.
fn require_keyword(schema_version: &SchemaVersion, field_name: &str) -> Result<()> {
    let actual = schema_version.mapping.kind_of(field_name);
    if actual == Some(FieldKind::Keyword) {
        return Ok(());
    }
    Err(Error::SchemaMismatch {
        field: field_name.to_string(),
        expected: FieldKind::Keyword.to_string(),
        actual: actual.map_or_else(|| "missing".to_string(), |k| k.to_string()),
    })
}

fn record_to_doc(
    schema: &Schema,
    schema_version: &SchemaVersion,
    record: &DocumentRecord,
) -> Result<TantivyDocument> {
    let mut doc = TantivyDocument::default();
    doc.add_text(schema.get_field(ID_FIELD).map_err(classify)?, &record.id);
    for (name, _) in &schema_version.mapping.fields {
        let f = schema.get_field(name).map_err(classify)?;
        if let Some(text) = record.text_of(name) {
            doc.add_text(f, text);
        }
        for term in record.terms_of(name) {
            doc.add_text(f, term);
        }
    }
    let source = serde_json::to_string(record)
        .map_err(|e| anyhow::anyhow!("serializing document '{}': {}", record.id, e))?;
    doc.add_text(schema.get_field(SOURCE_FIELD).map_err(classify)?, source);
    Ok(doc)
}

fn source_record(schema: &Schema, doc: &TantivyDocument) -> Result<DocumentRecord> {
    let source_field = schema.get_field(SOURCE_FIELD).map_err(classify)?;
    let raw = doc
        .get_first(source_field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("stored document is missing its source payload"))?;
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("stored document is corrupt: {}", e).into())
}

/// Map tantivy failures onto the shared taxonomy. Lock contention and I/O
/// hiccups are worth a bounded retry; anything else surfaces as an engine
/// error without leaking through to end callers.
fn classify(e: TantivyError) -> Error {
    match &e {
        TantivyError::LockFailure(..) | TantivyError::IoError(..) => Error::Transient {
            reason: e.to_string(),
        },
        _ => Error::Engine(anyhow::anyhow!(e)),
    }
}
