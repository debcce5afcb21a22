use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::matcher::{fuzzy_match, SearchPrecision};

/// One previously executed query. Plain data; the presentation layer re-runs
/// it by feeding `raw_query` back through the query box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub raw_query: String,
    pub executed_epoch_secs: u64,
}

/// Bounded log of executed queries, most recent last. Re-running a query
/// moves it to the back instead of duplicating it.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, raw_query: &str) {
        let raw_query = raw_query.trim();
        if raw_query.is_empty() || self.capacity == 0 {
            return;
        }

        self.entries.retain(|entry| entry.raw_query != raw_query);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            raw_query: raw_query.to_string(),
            executed_epoch_secs: now_secs(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Threshold-filtered view over the static set: an entry stays if its
    /// query text meets the precision bar. No top-N truncation here.
    pub fn filtered(&self, pattern: &str, precision: SearchPrecision) -> Vec<HistoryEntry> {
        if pattern.trim().is_empty() {
            return self.entries.iter().cloned().collect();
        }
        self.entries
            .iter()
            .filter(|entry| matches_precision(pattern, &[&entry.raw_query], precision))
            .cloned()
            .collect()
    }
}

/// True when any of the texts fuzzy-matches the pattern at or above the
/// precision threshold.
pub fn matches_precision(pattern: &str, texts: &[&str], precision: SearchPrecision) -> bool {
    texts
        .iter()
        .filter_map(|text| fuzzy_match(pattern, text))
        .any(|result| precision.met_by(result.score))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextCommand {
    /// Toggle the pin record for the selected result. `currently_pinned`
    /// tells the presentation layer which label it confirmed.
    TogglePin { currently_pinned: bool },
    ProviderInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenuEntry {
    pub title: String,
    pub subtitle: String,
    pub command: ContextCommand,
}

/// Context menu for one selected result: the pin toggle first, then the
/// producing provider's info line.
pub fn context_menu_entries(
    result_title: &str,
    provider_name: &str,
    currently_pinned: bool,
) -> Vec<ContextMenuEntry> {
    let pin_title = if currently_pinned {
        format!("Unpin '{result_title}'")
    } else {
        format!("Pin '{result_title}' to top")
    };

    vec![
        ContextMenuEntry {
            title: pin_title,
            subtitle: "Pinned results always rank first".to_string(),
            command: ContextCommand::TogglePin { currently_pinned },
        },
        ContextMenuEntry {
            title: format!("Provider: {provider_name}"),
            subtitle: "Source of the selected result".to_string(),
            command: ContextCommand::ProviderInfo,
        },
    ]
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{context_menu_entries, ContextCommand, HistoryLog};
    use crate::matcher::SearchPrecision;

    #[test]
    fn history_deduplicates_and_moves_rerun_to_back() {
        let mut log = HistoryLog::new(10);
        log.push("notes");
        log.push("terminal");
        log.push("notes");

        let queries: Vec<&str> = log.entries().map(|e| e.raw_query.as_str()).collect();
        assert_eq!(queries, vec!["terminal", "notes"]);
    }

    #[test]
    fn history_drops_oldest_past_capacity() {
        let mut log = HistoryLog::new(2);
        log.push("one");
        log.push("two");
        log.push("three");

        let queries: Vec<&str> = log.entries().map(|e| e.raw_query.as_str()).collect();
        assert_eq!(queries, vec!["two", "three"]);
    }

    #[test]
    fn empty_filter_returns_everything() {
        let mut log = HistoryLog::new(10);
        log.push("notes");
        log.push("terminal");
        assert_eq!(log.filtered("", SearchPrecision::Regular).len(), 2);
    }

    #[test]
    fn filter_keeps_only_entries_meeting_the_threshold() {
        let mut log = HistoryLog::new(10);
        log.push("open terminal");
        log.push("quarterly report");

        let filtered = log.filtered("term", SearchPrecision::Regular);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].raw_query, "open terminal");
    }

    #[test]
    fn context_menu_offers_pin_toggle_then_provider_info() {
        let entries = context_menu_entries("Notes.txt", "Files", false);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].command,
            ContextCommand::TogglePin {
                currently_pinned: false
            }
        );
        assert!(entries[0].title.contains("Pin"));
        assert_eq!(entries[1].command, ContextCommand::ProviderInfo);
        assert!(entries[1].title.contains("Files"));
    }
}
