//! End-to-end tests of the search operator.

use serde_json::{json, Value};
use sift_core::{
    Collection, Config, FullScanReason, Ineligibility, RegexSearch, SearchConfig, SearchStrategy,
};
use std::sync::Arc;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sift_core=debug")
        .with_test_writer()
        .try_init();
}

fn log_lines(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let level = match i % 10 {
                0 => "ERROR",
                1 | 2 => "WARN",
                _ => "INFO",
            };
            json!({
                "_id": format!("line-{}", i),
                "entry": { "message": format!("{} request {} served by worker-{}", level, i, i % 7) },
            })
        })
        .collect()
}

#[test]
fn test_nested_field_search() {
    init_tracing();
    let search = RegexSearch::new();
    let collection = Collection::from_documents(log_lines(100));

    let out = search.search(&collection, "entry.message", "ERROR request", "", None);
    assert_eq!(out.len(), 10);
    assert!(out.positions.iter().all(|p| p % 10 == 0));
    assert_eq!(out.strategy, SearchStrategy::Accelerated { candidates: 10 });
}

#[test]
fn test_parallel_path_matches_sequential() {
    let docs = log_lines(500);
    let sequential = RegexSearch::new();
    let parallel = RegexSearch::with_config(SearchConfig {
        parallel_threshold: 1,
        ..SearchConfig::default()
    });

    let a = Collection::from_documents(docs.clone());
    let b = Collection::from_documents(docs);
    for pattern in ["WARN", "worker-3$", "request 4\\d\\d ", "info"] {
        let left = sequential.search(&a, "entry.message", pattern, "i", None);
        let right = parallel.search(&b, "entry.message", pattern, "i", None);
        assert_eq!(left.positions, right.positions, "pattern {}", pattern);
    }
}

#[test]
fn test_concurrent_queries_share_one_index() {
    init_tracing();
    let search = Arc::new(RegexSearch::new());
    let collection = Arc::new(Collection::from_documents(log_lines(200)));

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let search = Arc::clone(&search);
            let collection = Arc::clone(&collection);
            scope.spawn(move || {
                let pattern = format!("worker-{}", worker % 7);
                let out = search.search(&collection, "entry.message", &pattern, "", None);
                assert!(!out.is_empty());
                assert!(out
                    .documents
                    .iter()
                    .all(|d| d["entry"]["message"].as_str().unwrap_or("").contains(&pattern)));
            });
        }
    });

    let stats = search.stats();
    assert_eq!(stats.total_queries, 8);
    assert!(stats.index_builds >= 1);
    assert_eq!(search.index_count(), 1);
}

#[test]
fn test_operator_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sift.toml");
    std::fs::write(
        &path,
        "[search]\nmin_literal_length = 6\n\n[index]\nbloom_filter_size_bytes = 64\n",
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    let search = RegexSearch::from_config(&config);
    assert_eq!(search.config().bloom_filter_size_bytes, 64);

    let collection = Collection::from_documents(log_lines(50));
    let out = search.search(&collection, "entry.message", "ERROR", "", None);
    assert_eq!(out.len(), 5);
    assert_eq!(
        out.strategy,
        SearchStrategy::FullScan(FullScanReason::Ineligible(Ineligibility::TooShort))
    );
}

#[test]
fn test_regex_only_pattern_scans_everything() {
    let search = RegexSearch::new();
    let collection = Collection::from_documents(log_lines(20));

    let out = search.search(&collection, "entry.message", ".*", "", None);
    assert_eq!(out.len(), 20);
    assert!(matches!(out.strategy, SearchStrategy::FullScan(_)));
    assert_eq!(search.stats().short_patterns, 1);
}

#[test]
fn test_collection_mutations_are_seen() {
    init_tracing();
    let search = RegexSearch::new();
    let mut collection = Collection::from_documents(log_lines(20));

    let before = search.search(&collection, "entry.message", "FATAL", "", None);
    assert!(before.is_empty());

    collection.replace(
        3,
        json!({ "entry": { "message": "FATAL disk full" } }),
    );
    let after = search.search(&collection, "entry.message", "FATAL", "", None);
    assert_eq!(after.positions, vec![3]);

    collection.remove(3);
    let removed = search.search(&collection, "entry.message", "FATAL", "", None);
    assert!(removed.is_empty());
}
