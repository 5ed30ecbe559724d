use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use docdex_core::config::{EngineConfig, IndexConfig};
use docdex_core::error::Error;
use docdex_core::traits::SearchEngine;
use docdex_core::types::{field, DocumentRecord, FieldKind, Mapping, SchemaVersion};
use docdex_engine::TantivyEngine;
use docdex_index::{Indexer, SchemaMigrator};

fn engine_in(dir: &tempfile::TempDir) -> Arc<TantivyEngine> {
    let cfg = EngineConfig {
        data_dir: dir.path().to_string_lossy().to_string(),
        ..EngineConfig::default()
    };
    Arc::new(TantivyEngine::new(&cfg).expect("engine"))
}

fn record(id: &str, tags: &[&str]) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        filename: format!("{}.txt", id),
        doc_type: "Text Document".to_string(),
        content: format!("content for {}", id),
        summary: format!("summary for {}", id),
        keywords: vec![],
        tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        metadata: BTreeMap::new(),
        indexed_at: 0,
        file_size: 0,
        file_path: format!("/docs/{}.txt", id),
    }
}

/// Seed an index still carrying the legacy analyzed `tags` mapping.
fn seed_legacy(engine: &TantivyEngine) {
    let legacy = SchemaVersion {
        generation: 1,
        mapping: Mapping::legacy_text_tags(),
    };
    engine.create_index("documents-g000001", &legacy).expect("create");
    engine.ensure_alias("documents", "documents-g000001").expect("alias");
    let records = vec![
        record("a", &["IT"]),
        record("b", &["HR"]),
        record("c", &["IT"]),
    ];
    engine.bulk_put("documents", &records).expect("seed");
}

#[test]
fn migration_preserves_count_and_upgrades_tags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed_legacy(&engine);
    let before = engine.count("documents").expect("count");

    let migrator = SchemaMigrator::new(engine.clone(), &IndexConfig::default());
    let report = migrator
        .migrate("documents", Mapping::current())
        .expect("migration");

    assert_eq!(report.documents, before);
    assert_eq!(report.from, "documents-g000001");
    assert_eq!(report.to, "documents-g000002");

    // Count through the alias is identical before and after.
    assert_eq!(engine.count("documents").expect("count"), before);
    // The alias now resolves to the new generation with keyword tags.
    let schema = engine.get_schema("documents").expect("schema");
    assert_eq!(schema.generation, 2);
    assert_eq!(schema.mapping.kind_of(field::TAGS), Some(FieldKind::Keyword));
    // The old index is gone.
    assert!(engine.get_schema("documents-g000001").is_err());
    // Exact-match aggregation works post-migration.
    let counts = engine.tag_counts("documents").expect("tags");
    assert_eq!(counts.get("IT"), Some(&2));
    assert_eq!(counts.get("HR"), Some(&1));
}

#[test]
fn reads_succeed_during_the_copy_phase() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed_legacy(&engine);

    // Simulate "during the copy": the new index exists and is half-filled,
    // but the alias has not been swapped. Reads through the alias must
    // still resolve to the old, complete index.
    let next = SchemaVersion {
        generation: 2,
        mapping: Mapping::current(),
    };
    engine.create_index("documents-g000002", &next).expect("create");
    engine
        .put("documents-g000002", &record("a", &["IT"]))
        .expect("partial copy");

    assert_eq!(engine.count("documents").expect("count"), 3);
    assert_eq!(
        engine.get("documents", "b").expect("read during copy").id,
        "b"
    );
}

#[test]
fn failed_migration_leaves_old_index_authoritative() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed_legacy(&engine);

    // Zero timeout forces the copy phase to fail immediately.
    let cfg = IndexConfig {
        migration_timeout_secs: 0,
        ..IndexConfig::default()
    };
    let migrator = SchemaMigrator::new(engine.clone(), &cfg);
    let err = migrator
        .migrate("documents", Mapping::current())
        .expect_err("should time out");
    assert!(matches!(err, Error::MigrationFailed { .. }));

    // Old index still serves reads through the alias; the half-built
    // destination was cleaned up.
    assert_eq!(engine.count("documents").expect("count"), 3);
    assert_eq!(
        engine.resolve_alias("documents").expect("alias").as_deref(),
        Some("documents-g000001")
    );
    assert!(engine.get_schema("documents-g000002").is_err());
}

#[test]
fn legacy_tags_mapping_rejects_aggregation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed_legacy(&engine);

    let err = engine.tag_counts("documents").expect_err("drifted mapping");
    assert!(matches!(err, Error::SchemaMismatch { .. }));

    let migrator = SchemaMigrator::new(engine.clone(), &IndexConfig::default());
    migrator
        .migrate("documents", Mapping::current())
        .expect("migration");
    assert!(engine.tag_counts("documents").is_ok());
}

#[test]
fn indexer_bootstraps_and_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    let indexer =
        Indexer::new(engine.clone(), "documents", &IndexConfig::default()).expect("indexer");

    let doc = record("a", &["IT"]);
    let id = indexer.upsert(&doc).expect("upsert");
    assert_eq!(id, "a");
    let fetched = indexer.get("a").expect("get");
    assert_eq!(fetched.content.as_bytes(), doc.content.as_bytes());
    assert!(fetched.indexed_at > 0);

    indexer.delete("a").expect("delete");
    assert!(matches!(indexer.get("a"), Err(Error::NotFound { .. })));
}

#[test]
fn indexer_migrates_drifted_schema_on_startup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(&dir);
    seed_legacy(&engine);

    let _indexer =
        Indexer::new(engine.clone(), "documents", &IndexConfig::default()).expect("indexer");

    let schema = engine.get_schema("documents").expect("schema");
    assert_eq!(schema.mapping.kind_of(field::TAGS), Some(FieldKind::Keyword));
    assert_eq!(engine.count("documents").expect("count"), 3);
}
