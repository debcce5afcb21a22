use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use beacon_core::plugin::Provider;
use beacon_core::providers::{AppCatalogProvider, FileScanProvider};
use beacon_core::query::Query;

fn unique_temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("beacon-{label}-{nanos}"));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn query(raw: &str) -> Query {
    Query::parse(raw, &BTreeSet::new()).expect("query should parse")
}

#[test]
fn file_scan_finds_matching_files_under_the_root() {
    let dir = unique_temp_dir("scan");
    std::fs::write(dir.join("quarterly_report.txt"), b"q3").expect("file should write");
    std::fs::write(dir.join("notes.md"), b"notes").expect("file should write");
    let nested = dir.join("nested");
    std::fs::create_dir_all(&nested).expect("nested dir should be creatable");
    std::fs::write(nested.join("report_draft.txt"), b"draft").expect("file should write");

    let provider = FileScanProvider::new(dir.clone(), 10);
    let results = provider
        .query(&query("report"), &CancellationToken::new())
        .expect("scan should succeed");

    let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
    assert!(titles.contains(&"quarterly_report.txt"));
    assert!(titles.contains(&"report_draft.txt"));
    assert!(!titles.contains(&"notes.md"));

    std::fs::remove_dir_all(&dir).expect("temp dir should be removable");
}

#[test]
fn file_scan_honours_the_result_limit() {
    let dir = unique_temp_dir("limit");
    for index in 0..8 {
        std::fs::write(dir.join(format!("match_{index}.txt")), b"x").expect("file should write");
    }

    let provider = FileScanProvider::new(dir.clone(), 3);
    let results = provider
        .query(&query("match"), &CancellationToken::new())
        .expect("scan should succeed");
    assert_eq!(results.len(), 3);

    std::fs::remove_dir_all(&dir).expect("temp dir should be removable");
}

#[test]
fn cancelled_scan_reports_cancelled_instead_of_a_batch() {
    let dir = unique_temp_dir("cancel");
    std::fs::write(dir.join("anything.txt"), b"x").expect("file should write");

    let provider = FileScanProvider::new(dir.clone(), 10);
    let token = CancellationToken::new();
    token.cancel();
    let error = provider
        .query(&query("anything"), &token)
        .expect_err("cancelled scan should not produce a batch");
    assert_eq!(error, beacon_core::plugin::ProviderError::Cancelled);

    std::fs::remove_dir_all(&dir).expect("temp dir should be removable");
}

#[test]
fn catalog_loads_from_json_file() {
    let dir = unique_temp_dir("catalog");
    let path = dir.join("catalog.json");
    std::fs::write(
        &path,
        r#"{
            "entries": [
                { "title": "Image Viewer", "subtitle": "Pictures", "path": "/usr/bin/viewer" },
                { "title": "Music Player", "path": "/usr/bin/player" }
            ]
        }"#,
    )
    .expect("catalog should write");

    let provider = AppCatalogProvider::from_json_file(&path, 5).expect("catalog should load");
    let results = provider
        .query(&query("viewer"), &CancellationToken::new())
        .expect("query should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Image Viewer");
    assert_eq!(results[0].subtitle, "Pictures");

    std::fs::remove_dir_all(&dir).expect("temp dir should be removable");
}

#[test]
fn malformed_catalog_file_is_a_provider_fault() {
    let dir = unique_temp_dir("badcatalog");
    let path = dir.join("catalog.json");
    std::fs::write(&path, "not json").expect("catalog should write");

    let error = AppCatalogProvider::from_json_file(&path, 5)
        .expect_err("malformed catalog should be rejected");
    assert!(matches!(
        error,
        beacon_core::plugin::ProviderError::Failed(_)
    ));

    std::fs::remove_dir_all(&dir).expect("temp dir should be removable");
}
