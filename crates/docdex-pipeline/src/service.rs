use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use walkdir::WalkDir;

use docdex_answer::{AnswerSynthesizer, HttpGenerator};
use docdex_core::config::DocdexConfig;
use docdex_core::error::{Error, Result};
use docdex_core::traits::{DocumentParser, SearchEngine};
use docdex_core::types::{field, AnswerResult, DocumentRecord, SearchContext, SearchHit};
use docdex_index::Indexer;
use docdex_query::{negotiate, QueryOptions, QueryPlanner};

use crate::parse::ParserRegistry;

/// Search outcome for callers: the ranked hits, whether highlighting was
/// degraded, and the optional synthesized answer.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub degraded: bool,
    pub answer: Option<AnswerResult>,
}

/// Result of ingesting a directory. Per-file parse failures are collected
/// here instead of aborting the batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub indexed: usize,
    pub skipped: usize,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub documents: u64,
    pub doc_types: BTreeMap<String, u64>,
    pub tags: BTreeMap<String, u64>,
}

/// The search-and-answer pipeline behind one explicit context object,
/// constructed once at process start and passed to every stage: engine
/// client, planner, synthesizer, indexer and parser registry.
pub struct DocdexService {
    engine: Arc<dyn SearchEngine>,
    alias: String,
    planner: QueryPlanner,
    synthesizer: AnswerSynthesizer,
    indexer: Indexer,
    parsers: ParserRegistry,
}

impl DocdexService {
    pub fn new(engine: Arc<dyn SearchEngine>, cfg: &DocdexConfig) -> Result<Self> {
        let planner = QueryPlanner::new(&cfg.search, &cfg.engine);
        let mut synthesizer = AnswerSynthesizer::new(cfg.answer.clone());
        if let Some(generator_cfg) = &cfg.answer.generator {
            match HttpGenerator::new(generator_cfg) {
                Ok(generator) => synthesizer = synthesizer.with_generator(Box::new(generator)),
                Err(e) => warn!(error = %e, "generator disabled; answers stay local"),
            }
        }
        let indexer = Indexer::new(Arc::clone(&engine), &cfg.engine.alias, &cfg.index)?;
        Ok(DocdexService {
            engine,
            alias: cfg.engine.alias.clone(),
            planner,
            synthesizer,
            indexer,
            parsers: ParserRegistry::new(),
        })
    }

    /// Query path: plan, execute with highlight negotiation, optionally
    /// synthesize an answer. A query with no matches returns empty hits
    /// and a confidence-0 answer, never an error.
    pub fn search(
        &self,
        query: &str,
        options: &QueryOptions,
        use_answer: bool,
    ) -> Result<SearchResponse> {
        let request = self.planner.plan(query, options)?;
        let negotiated = negotiate(self.engine.as_ref(), &self.alias, &request)?;

        let answer = if use_answer {
            let context = SearchContext {
                query: request.query.clone(),
                hits: negotiated.hits.clone(),
                size: request.size,
            };
            Some(self.synthesizer.synthesize(&context))
        } else {
            None
        };

        Ok(SearchResponse {
            query: request.query,
            hits: negotiated.hits,
            degraded: negotiated.degraded,
            answer,
        })
    }

    pub fn upsert_document(&self, record: &DocumentRecord) -> Result<String> {
        self.indexer.upsert(record)
    }

    pub fn delete_document(&self, id: &str) -> Result<()> {
        self.indexer.delete(id)
    }

    pub fn get_document(&self, id: &str) -> Result<DocumentRecord> {
        self.indexer.get(id)
    }

    /// Tag -> document count over the exact-match `tags` field.
    pub fn tag_aggregation(&self) -> Result<BTreeMap<String, u64>> {
        self.engine.tag_counts(&self.alias)
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            documents: self.engine.count(&self.alias)?,
            doc_types: self.engine.term_counts(&self.alias, field::DOC_TYPE)?,
            tags: self.engine.tag_counts(&self.alias)?,
        })
    }

    /// Walk `dir`, parse every supported file and upsert it. A parse or
    /// read failure is recorded and the batch continues; unsupported
    /// extensions are counted as skipped.
    pub fn index_directory(&self, dir: &Path, tags: &[String]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let filename = entry.file_name().to_string_lossy().to_string();
            if !ParserRegistry::supported(&filename) {
                report.skipped += 1;
                continue;
            }
            match self.ingest_file(dir, path, &filename, tags) {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping file");
                    report.failed.push((path.display().to_string(), e.to_string()));
                }
            }
        }
        info!(
            indexed = report.indexed,
            skipped = report.skipped,
            failed = report.failed.len(),
            "directory ingest finished"
        );
        Ok(report)
    }

    fn ingest_file(&self, base: &Path, path: &Path, filename: &str, tags: &[String]) -> Result<()> {
        let bytes = std::fs::read(path).map_err(|e| Error::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let parsed = self.parsers.parse(&bytes, filename)?;
        let id = path
            .strip_prefix(base)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();
        let record = DocumentRecord {
            id,
            filename: filename.to_string(),
            doc_type: parsed.doc_type,
            content: parsed.content,
            summary: parsed.summary,
            keywords: parsed.keywords,
            tags: tags.iter().cloned().collect(),
            metadata: parsed.metadata,
            indexed_at: 0, // stamped by the indexer
            file_size: bytes.len() as u64,
            file_path: path.display().to_string(),
        };
        self.indexer.upsert(&record)?;
        Ok(())
    }
}
