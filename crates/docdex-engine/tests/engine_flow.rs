use std::collections::{BTreeMap, BTreeSet};

use docdex_core::config::EngineConfig;
use docdex_core::error::Error;
use docdex_core::traits::SearchEngine;
use docdex_core::types::{
    field, DocumentRecord, FieldBoost, HighlightSpec, SchemaVersion, SearchRequest,
};
use docdex_engine::TantivyEngine;

fn engine_in(dir: &tempfile::TempDir) -> TantivyEngine {
    let cfg = EngineConfig {
        data_dir: dir.path().to_string_lossy().to_string(),
        ..EngineConfig::default()
    };
    TantivyEngine::new(&cfg).expect("engine")
}

fn record(id: &str, content: &str, tags: &[&str]) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        filename: format!("{}.txt", id),
        doc_type: "Text Document".to_string(),
        content: content.to_string(),
        summary: content.chars().take(120).collect(),
        keywords: vec!["handbook".to_string()],
        tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        metadata: BTreeMap::new(),
        indexed_at: 1_700_000_000,
        file_size: content.len() as u64,
        file_path: format!("/docs/{}.txt", id),
    }
}

fn request(query: &str, limit: usize) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        fields: vec![
            FieldBoost { field: field::FILENAME.to_string(), boost: 3.0 },
            FieldBoost { field: field::SUMMARY.to_string(), boost: 2.0 },
            FieldBoost { field: field::CONTENT.to_string(), boost: 1.0 },
        ],
        tag_filter: BTreeSet::new(),
        size: limit,
        fuzzy: false,
        highlight: HighlightSpec {
            fields: vec![
                field::CONTENT.to_string(),
                field::SUMMARY.to_string(),
                field::FILENAME.to_string(),
            ],
            max_analyzed_offset: 10_000_000,
            fragment_chars: 200,
        },
    }
}

fn seed(engine: &TantivyEngine) {
    engine
        .create_index("documents-g000001", &SchemaVersion::initial())
        .expect("create index");
    engine
        .ensure_alias("documents", "documents-g000001")
        .expect("alias");
    let records = vec![
        record("a", "the onboarding handbook explains vacation policy in detail", &["IT"]),
        record("b", "payroll schedules and vacation accrual rules for employees", &["HR"]),
        record("c", "network setup guide for the onboarding of new laptops", &["IT"]),
    ];
    engine.bulk_put("documents", &records).expect("bulk put");
}

#[test]
fn search_highlights_matching_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    let hits = engine.search("documents", &request("vacation", 10)).expect("search");
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
    let highlighted = hits
        .iter()
        .any(|h| h.highlights.get(field::CONTENT).is_some_and(|s| !s.is_empty()));
    assert!(highlighted, "expected a content snippet for a matching query");
}

#[test]
fn tag_filter_is_exact_match() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    let mut req = request("onboarding", 10);
    req.tag_filter = BTreeSet::from(["IT".to_string()]);
    let hits = engine.search("documents", &req).expect("search");
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.tags.contains("IT")));
}

#[test]
fn oversized_field_yields_typed_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    let mut req = request("vacation", 10);
    req.highlight.max_analyzed_offset = 16;
    let err = engine.search("documents", &req).expect_err("should refuse to highlight");
    match err {
        Error::FieldLengthExceeded { field } => assert_eq!(field, "content"),
        other => panic!("expected FieldLengthExceeded, got {other:?}"),
    }
}

#[test]
fn tag_aggregation_counts_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    let counts = engine.tag_counts("documents").expect("tag counts");
    assert_eq!(counts.get("IT"), Some(&2));
    assert_eq!(counts.get("HR"), Some(&1));
}

#[test]
fn tag_aggregation_ignores_deleted_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    engine.delete("documents", "b").expect("delete");
    assert_eq!(engine.count("documents").expect("count"), 2);
    let counts = engine.tag_counts("documents").expect("tag counts");
    assert_eq!(counts.get("IT"), Some(&2));
    assert!(!counts.contains_key("HR"), "deleted document still counted");

    // Replacing a document must not double-count its tags either.
    let replacement = record("a", "rewritten onboarding notes", &["IT"]);
    engine.put("documents", &replacement).expect("upsert");
    let counts = engine.tag_counts("documents").expect("tag counts");
    assert_eq!(counts.get("IT"), Some(&2));
}

#[test]
fn get_round_trips_content_byte_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    let original = record("a", "the onboarding handbook explains vacation policy in detail", &["IT"]);
    let fetched = engine.get("documents", "a").expect("get");
    assert_eq!(fetched.content.as_bytes(), original.content.as_bytes());
    assert_eq!(fetched, original);
}

#[test]
fn upsert_replaces_by_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    let replacement = record("a", "rewritten content entirely", &["IT"]);
    engine.put("documents", &replacement).expect("upsert");
    assert_eq!(engine.count("documents").expect("count"), 3);
    assert_eq!(engine.get("documents", "a").expect("get").content, "rewritten content entirely");
}

#[test]
fn delete_then_get_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    engine.delete("documents", "b").expect("delete");
    assert!(matches!(
        engine.get("documents", "b"),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        engine.delete("documents", "b"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn scroll_streams_every_document_in_batches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed(&engine);

    let mut seen = Vec::new();
    engine
        .scroll("documents", 2, &mut |batch| {
            assert!(batch.len() <= 2);
            seen.extend(batch.iter().map(|r| r.id.clone()));
            Ok(())
        })
        .expect("scroll");
    seen.sort();
    assert_eq!(seen, vec!["a", "b", "c"]);
}

#[test]
fn unknown_target_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    assert!(engine.search("nowhere", &request("q", 5)).is_err());
}
