//! End-to-end tests for the knowledge base

use super::*;
use std::collections::{BTreeMap, BTreeSet};
use tempfile::tempdir;

fn file_kb() -> KnowledgeBase {
    let mut kb = KnowledgeBase::default();
    kb.add_entry("open a file", [("文件", "file")]).unwrap();
    kb.add_entry("close a file", [("文件", "document"), ("关闭", "close")])
        .unwrap();
    kb
}

fn matches(pairs: &[(&str, &str)]) -> Vec<TermMatch> {
    pairs
        .iter()
        .map(|(s, t)| TermMatch {
            source_term: s.to_string(),
            target_term: t.to_string(),
        })
        .collect()
}

fn positions(kb: &KnowledgeBase, term: &str) -> Vec<usize> {
    kb.term_index()
        .get(term)
        .map(|p| p.iter().copied().collect())
        .unwrap_or_default()
}

#[test]
fn test_duplicate_context_is_noop() {
    let mut kb = KnowledgeBase::default();
    assert!(kb.add_entry("open a file", [("文件", "file")]).unwrap());
    assert!(!kb.add_entry("open a file", [("文件", "archive")]).unwrap());

    assert_eq!(kb.len(), 1);
    assert_eq!(kb.entries()[0].terms["文件"], "file");
    assert_eq!(positions(&kb, "文件"), vec![0]);
}

#[test]
fn test_context_without_word_chars_is_rejected() {
    let mut kb = KnowledgeBase::default();
    let err = kb.add_entry("?! ...", [("x", "y")]).unwrap_err();
    assert!(matches!(err, KbError::Validation(_)));
    assert!(kb.is_empty());
    assert!(kb.term_index().is_empty());
}

#[test]
fn test_search_prefers_closest_context() {
    let mut kb = file_kb();
    let found = kb.search("open the file 文件").unwrap();
    assert_eq!(found, matches(&[("文件", "file")]));
}

#[test]
fn test_search_ranks_by_similarity() {
    let mut kb = file_kb();
    let candidates = kb.candidate_terms("close the file 文件");
    assert_eq!(candidates, BTreeSet::from(["文件".to_string()]));

    let ranked = kb.rank_candidates("close the file 文件", &candidates, 9, 0.0).unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].index, 1);
    assert!(ranked[0].similarity > ranked[1].similarity);
}

#[test]
fn test_search_requires_a_term_mention() {
    let mut kb = file_kb();
    assert!(kb.search("open the file").unwrap().is_empty());
}

#[test]
fn test_threshold_above_every_similarity_returns_nothing() {
    let mut kb = file_kb();
    assert!(kb.search_with("open the file 文件", 9, 1.5).unwrap().is_empty());
}

#[test]
fn test_top_n_limits_entries() {
    let mut kb = file_kb();
    // Only the closest entry is kept, so "关闭" (present only in entry 1) drops out.
    let found = kb.search_with("open file 文件 关闭", 1, 0.0).unwrap();
    assert_eq!(found, matches(&[("文件", "file")]));

    let found = kb.search_with("open file 文件 关闭", 2, 0.0).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_empty_kb_search_is_empty() {
    let mut kb = KnowledgeBase::default();
    assert!(kb.search("anything at all").unwrap().is_empty());
}

#[test]
fn test_search_clears_dirty_flag() {
    let mut kb = file_kb();
    assert!(kb.is_dirty());
    kb.search("文件").unwrap();
    assert!(!kb.is_dirty());
    kb.add_entry("read a file", [("读取", "read")]).unwrap();
    assert!(kb.is_dirty());
}

#[test]
fn test_delete_shifts_higher_positions() {
    let mut kb = KnowledgeBase::default();
    kb.add_entry("alpha context", [("x", "1")]).unwrap();
    kb.add_entry("beta context", [("y", "2")]).unwrap();
    kb.add_entry("gamma context", [("x", "3"), ("z", "4")]).unwrap();

    assert_eq!(kb.delete_entries("beta context"), 1);
    assert_eq!(kb.len(), 2);
    assert_eq!(positions(&kb, "x"), vec![0, 1]);
    assert_eq!(positions(&kb, "z"), vec![1]);
    assert!(!kb.term_index().contains_key("y"));
    assert!(kb.index_is_consistent());
    assert!(kb.is_dirty());
}

#[test]
fn test_delete_missing_context_changes_nothing() {
    let mut kb = file_kb();
    kb.search("文件").unwrap();
    assert_eq!(kb.delete_entries("no such context"), 0);
    assert_eq!(kb.len(), 2);
    assert!(!kb.is_dirty());
}

#[test]
fn test_delete_removes_every_duplicate() {
    let snapshot = KnowledgeSnapshot {
        knowledge: vec![
            EntrySnapshot {
                context: "same".into(),
                terms: BTreeMap::from([("a".to_string(), "1".to_string())]),
                vector_data: vec![],
                vector_shape: [0, 0],
            },
            EntrySnapshot {
                context: "other".into(),
                terms: BTreeMap::from([("a".to_string(), "2".to_string())]),
                vector_data: vec![],
                vector_shape: [0, 0],
            },
            EntrySnapshot {
                context: "same".into(),
                terms: BTreeMap::from([("b".to_string(), "3".to_string())]),
                vector_data: vec![],
                vector_shape: [0, 0],
            },
        ],
        term_index: BTreeMap::new(),
        vectorizer_params: BTreeMap::new(),
    };
    let mut kb = KnowledgeBase::from_snapshot(snapshot, KbConfig::default()).unwrap();
    assert_eq!(kb.delete_entries("same"), 2);
    assert_eq!(kb.entries()[0].context, "other");
    assert_eq!(positions(&kb, "a"), vec![0]);
    assert!(kb.index_is_consistent());
}

#[test]
fn test_save_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kb.json");

    let mut kb = file_kb();
    kb.save(Some(path.as_path())).unwrap();

    let restored = KnowledgeBase::load(&path).unwrap();
    assert_eq!(restored.len(), kb.len());
    for (a, b) in kb.entries().iter().zip(restored.entries()) {
        assert_eq!(a.context, b.context);
        assert_eq!(a.terms, b.terms);
        assert_eq!(
            a.vector.as_ref().map(SparseVector::dim),
            b.vector.as_ref().map(SparseVector::dim)
        );
    }
    assert_eq!(restored.term_index(), kb.term_index());
    assert!(restored.is_dirty());
    assert_eq!(restored.config().path.as_deref(), Some(path.as_path()));
}

#[test]
fn test_loaded_kb_answers_like_the_original() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kb.json");

    let mut kb = file_kb();
    let before = kb.search("open the file 文件").unwrap();
    kb.save(Some(path.as_path())).unwrap();

    let mut restored = KnowledgeBase::load(&path).unwrap();
    assert_eq!(restored.search("open the file 文件").unwrap(), before);
}

#[test]
fn test_snapshot_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kb.json");
    file_kb().save(Some(path.as_path())).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let first = &raw["knowledge"][0];
    assert_eq!(first["context"], "open a file");
    assert_eq!(first["terms"]["文件"], "file");
    // vocabulary: close, file, open
    assert_eq!(first["vector_shape"], serde_json::json!([1, 3]));
    assert_eq!(first["vector_data"].as_array().unwrap().len(), 3);
    assert_eq!(raw["term_index"]["文件"], serde_json::json!([0, 1]));
    assert_eq!(raw["vectorizer_params"]["ngram_range"], serde_json::json!([1, 1]));
    assert_eq!(raw["vectorizer_params"]["tokenizer"], serde_json::Value::Null);
    assert!(raw["vectorizer_params"]["dtype"]
        .as_str()
        .unwrap()
        .starts_with("CLASS:"));
}

#[test]
fn test_save_without_path_fails() {
    let mut kb = file_kb();
    assert!(matches!(kb.save(None), Err(KbError::Configuration(_))));
}

#[test]
fn test_open_missing_file_then_save_to_it() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("kb.json");

    let mut kb = KnowledgeBase::open(&path).unwrap();
    assert!(kb.is_empty());
    kb.add_entry("open a file", [("文件", "file")]).unwrap();
    kb.save(None).unwrap();
    assert!(path.exists());

    let reopened = KnowledgeBase::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
}

#[test]
fn test_load_rejects_custom_tokenizer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(
        &path,
        r#"{
            "knowledge": [],
            "term_index": {},
            "vectorizer_params": { "tokenizer": "FUNCTION:jieba_cut" }
        }"#,
    )
    .unwrap();

    let err = KnowledgeBase::load(&path).unwrap_err();
    assert!(matches!(err, KbError::UnrestorableParameter { ref tag, .. } if tag == "FUNCTION:jieba_cut"));
}

#[test]
fn test_load_coerces_ngram_sequence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(
        &path,
        r#"{
            "knowledge": [
                { "context": "open local dir", "terms": { "目录": "directory" },
                  "vector_data": [], "vector_shape": [0, 0] }
            ],
            "term_index": { "目录": [0] },
            "vectorizer_params": { "ngram_range": [1, 2], "min_df": 1, "max_df": 1.0 }
        }"#,
    )
    .unwrap();

    let mut kb = KnowledgeBase::load(&path).unwrap();
    assert_eq!(kb.vectorizer().params().ngram_range, (1, 2));
    kb.rebuild().unwrap();
    assert!(kb.vectorizer().vocabulary().unwrap().contains_key("local dir"));
}

#[test]
fn test_load_repairs_inconsistent_term_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(
        &path,
        r#"{
            "knowledge": [
                { "context": "open a file", "terms": { "文件": "file" },
                  "vector_data": [], "vector_shape": [0, 0] }
            ],
            "term_index": { "文件": [3], "stale": [0] }
        }"#,
    )
    .unwrap();

    let kb = KnowledgeBase::load(&path).unwrap();
    assert!(kb.index_is_consistent());
    assert_eq!(positions(&kb, "文件"), vec![0]);
    assert!(!kb.term_index().contains_key("stale"));
}

#[test]
fn test_load_rejects_mismatched_vector_shape() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(
        &path,
        r#"{
            "knowledge": [
                { "context": "open a file", "terms": {},
                  "vector_data": [0.1, 0.2], "vector_shape": [1, 3] }
            ]
        }"#,
    )
    .unwrap();

    assert!(matches!(KnowledgeBase::load(&path), Err(KbError::Format(_))));
}

#[test]
fn test_empty_vocabulary_vectors_survive_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kb.json");

    let mut kb = KnowledgeBase::default();
    kb.add_entry("a b", [("x", "y")]).unwrap();
    kb.save(Some(path.as_path())).unwrap();
    assert_eq!(kb.entries()[0].vector.as_ref().map(SparseVector::dim), Some(0));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["knowledge"][0]["vector_shape"], serde_json::json!([1, 0]));

    let restored = KnowledgeBase::load(&path).unwrap();
    assert_eq!(restored.entries()[0].vector.as_ref().map(SparseVector::dim), Some(0));
}

#[test]
fn test_missing_vector_shape_loads_without_vector() {
    let snapshot: KnowledgeSnapshot = serde_json::from_str(
        r#"{ "knowledge": [ { "context": "open a file", "terms": {} } ] }"#,
    )
    .unwrap();
    let kb = KnowledgeBase::from_snapshot(snapshot, KbConfig::default()).unwrap();
    assert!(kb.entries()[0].vector.is_none());
}

#[test]
fn test_batch_import_counts_malformed_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("import.json");
    std::fs::write(
        &path,
        r#"[
            { "context": "missing terms" },
            { "context": "open a file", "terms": { "文件": "file" } },
            { "context": "close a file", "terms": { "关闭": "close" } }
        ]"#,
    )
    .unwrap();

    let mut kb = KnowledgeBase::default();
    let stats = kb.batch_import(&path).unwrap();
    assert_eq!(
        stats,
        ImportStats {
            added: 2,
            skipped: 0,
            errors: 1
        }
    );
    assert_eq!(kb.len(), 2);
}

#[test]
fn test_batch_import_skips_existing_contexts() {
    let mut kb = file_kb();
    let stats = kb
        .import_value(serde_json::json!([
            { "context": "open a file", "terms": { "文件": "archive" } },
            { "context": "rename a file", "terms": { "重命名": "rename" } },
            { "context": "rename a file", "terms": { "重命名": "move" } }
        ]))
        .unwrap();
    assert_eq!(stats.added, 1);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.errors, 0);
    assert_eq!(kb.entries()[0].terms["文件"], "file");
}

#[test]
fn test_batch_import_counts_validation_failures() {
    let mut kb = KnowledgeBase::default();
    let stats = kb
        .import_value(serde_json::json!([
            { "context": "...", "terms": { "a": "b" } },
            { "context": "valid context", "terms": { "a": "b" } },
            { "context": 7, "terms": {} },
            "not an object"
        ]))
        .unwrap();
    assert_eq!(stats.added, 1);
    assert_eq!(stats.errors, 3);
}

#[test]
fn test_batch_import_rejects_non_array() {
    let mut kb = KnowledgeBase::default();
    let err = kb
        .import_value(serde_json::json!({ "context": "x", "terms": {} }))
        .unwrap_err();
    assert!(matches!(err, KbError::Format(_)));
}

#[test]
fn test_fit_once_ignores_new_vocabulary() {
    let config = KbConfig {
        refit: RefitPolicy::FitOnce,
        ..KbConfig::default()
    };
    let mut kb = KnowledgeBase::new(config);
    kb.add_entry("open file", [("文件", "file")]).unwrap();
    kb.search("文件").unwrap();
    assert_eq!(kb.vectorizer().vocabulary_len(), 2);

    kb.add_entry("rename directory", [("目录", "directory")]).unwrap();
    let found = kb.search_with("rename directory 目录", 9, 0.1).unwrap();
    assert!(found.is_empty());
    assert_eq!(kb.vectorizer().vocabulary_len(), 2);
}

#[test]
fn test_every_rebuild_picks_up_new_vocabulary() {
    let mut kb = KnowledgeBase::default();
    kb.add_entry("open file", [("文件", "file")]).unwrap();
    kb.search("文件").unwrap();

    kb.add_entry("rename directory", [("目录", "directory")]).unwrap();
    let found = kb.search_with("rename directory 目录", 9, 0.1).unwrap();
    assert_eq!(found, matches(&[("目录", "directory")]));
    assert_eq!(kb.vectorizer().vocabulary_len(), 4);
}

#[test]
fn test_unvectorizable_contexts_degrade_to_zero_similarity() {
    let mut kb = KnowledgeBase::default();
    // Single-character tokens never enter the vocabulary.
    kb.add_entry("a b", [("x", "y")]).unwrap();
    let found = kb.search("x").unwrap();
    assert_eq!(found, matches(&[("x", "y")]));
    assert!(kb.search_with("x", 9, 0.01).unwrap().is_empty());
}
