use std::time::Instant;

use crate::merger::ResultMerger;
use crate::model::{noop_action, SearchResult};
use crate::record_store::RecordLookup;

struct NoRecords;

impl RecordLookup for NoRecords {
    fn is_pinned(&self, _result: &SearchResult) -> bool {
        false
    }

    fn selection_count(&self, _result: &SearchResult) -> i64 {
        0
    }
}

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

fn batch(provider_id: &str, size: usize) -> Vec<SearchResult> {
    (0..size)
        .map(|i| {
            SearchResult::new(
                format!("Document_{i:05}.txt"),
                format!("/docs/Document_{i:05}.txt"),
                (i % 997) as i64,
                provider_id,
                "doc",
                noop_action(),
            )
        })
        .collect()
}

#[test]
fn merge_and_rank_p95_under_50ms_at_10k_results() {
    let records = NoRecords;

    // Warmup.
    for _ in 0..5 {
        let mut merger = ResultMerger::new(5);
        merger.merge_batch("files", batch("files", 5_000), &records);
        merger.merge_batch("apps", batch("apps", 5_000), &records);
    }

    let mut batch_p95 = Vec::with_capacity(5);
    for _ in 0..5 {
        let mut samples = Vec::with_capacity(20);
        for _ in 0..20 {
            let files = batch("files", 5_000);
            let apps = batch("apps", 5_000);
            let mut merger = ResultMerger::new(5);
            let start = Instant::now();
            merger.merge_batch("files", files, &records);
            merger.merge_batch("apps", apps, &records);
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
        }
        batch_p95.push(p95_ms(&mut samples));
    }

    batch_p95.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_p95 = batch_p95[batch_p95.len() / 2];

    assert!(
        median_p95 <= 50.0,
        "median batch p95 too high: {median_p95:.3}ms (budget 50.0ms); batches={batch_p95:?}",
    );
}
