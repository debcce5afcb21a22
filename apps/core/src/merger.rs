use crate::model::SearchResult;
use crate::record_store::RecordLookup;

/// A merged entry with its derived rank value. `effective_score` is the only
/// thing the engine ever recomputes about a result after creation.
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub result: SearchResult,
    pub effective_score: i64,
    arrival: u64,
}

/// The live ordered view. Single-writer by construction: only the engine
/// control loop calls into it, so concurrent provider batches can never
/// interleave partial updates.
pub struct ResultMerger {
    entries: Vec<RankedResult>,
    arrival_counter: u64,
    visible: bool,
    boost_weight: i64,
}

impl ResultMerger {
    pub fn new(boost_weight: i64) -> Self {
        Self {
            entries: Vec::new(),
            arrival_counter: 0,
            visible: false,
            boost_weight,
        }
    }

    pub fn entries(&self) -> &[RankedResult] {
        &self.entries
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn get(&self, index: usize) -> Option<&RankedResult> {
        self.entries.get(index)
    }

    /// Upserts one provider's batch: that provider's previous rows go away,
    /// the new ones come in boosted, and the whole view is re-sorted. The
    /// caller has already discarded stale generations.
    pub fn merge_batch(
        &mut self,
        provider_id: &str,
        batch: Vec<SearchResult>,
        records: &dyn RecordLookup,
    ) {
        self.entries
            .retain(|entry| entry.result.provider_id != provider_id);

        for result in batch {
            let effective_score = self.boosted_score(&result, records);
            self.arrival_counter += 1;
            self.entries.push(RankedResult {
                result,
                effective_score,
                arrival: self.arrival_counter,
            });
        }

        self.resort();
        if !self.entries.is_empty() {
            self.visible = true;
        }
    }

    /// Recomputes a result's rank after a pin toggle without disturbing its
    /// arrival order.
    pub fn rescore(&mut self, index: usize, records: &dyn RecordLookup) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.effective_score = boosted(&entry.result, records, self.boost_weight);
        }
        self.resort();
    }

    pub fn remove_for(&mut self, provider_id: &str) {
        self.entries
            .retain(|entry| entry.result.provider_id != provider_id);
    }

    pub fn remove_except(&mut self, provider_id: &str) {
        self.entries
            .retain(|entry| entry.result.provider_id == provider_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.visible = false;
    }

    fn boosted_score(&self, result: &SearchResult, records: &dyn RecordLookup) -> i64 {
        boosted(result, records, self.boost_weight)
    }

    /// Descending effective score; ties break on stable arrival order so fast
    /// providers stay visually stable, never on provider id or title.
    fn resort(&mut self) {
        self.entries.sort_by(|a, b| {
            b.effective_score
                .cmp(&a.effective_score)
                .then_with(|| a.arrival.cmp(&b.arrival))
        });
    }
}

fn boosted(result: &SearchResult, records: &dyn RecordLookup, boost_weight: i64) -> i64 {
    if records.is_pinned(result) {
        return i64::MAX;
    }
    result
        .base_score
        .saturating_add(records.selection_count(result).saturating_mul(boost_weight))
}
