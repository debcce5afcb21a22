use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Failure raised by a result's deferred action. Surfaced to the caller of
/// `invoke`; the launcher window stays open and nothing else is torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ActionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActionError {}

/// Deferred, idempotent side effect attached to a result. `Ok(true)` asks the
/// presentation layer to close the launcher window.
pub type ResultAction = Arc<dyn Fn() -> Result<bool, ActionError> + Send + Sync>;

/// One ranked entry produced by a single provider invocation. Identity fields
/// never change after creation; only the derived effective score does, and
/// that lives in the merger, not here.
#[derive(Clone)]
pub struct SearchResult {
    pub title: String,
    pub subtitle: String,
    pub icon_path: String,
    pub base_score: i64,
    pub provider_id: String,
    pub origin_raw_query: String,
    pub action: ResultAction,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        base_score: i64,
        provider_id: impl Into<String>,
        origin_raw_query: impl Into<String>,
        action: ResultAction,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            icon_path: String::new(),
            base_score,
            provider_id: provider_id.into(),
            origin_raw_query: origin_raw_query.into(),
            action,
        }
    }

    pub fn with_icon(mut self, icon_path: impl Into<String>) -> Self {
        self.icon_path = icon_path.into();
        self
    }

    /// Stable identity used for pin records and selection counters.
    pub fn record_key(&self) -> String {
        format!("{}|{}|{}", self.provider_id, self.title, self.subtitle)
    }
}

impl std::fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResult")
            .field("title", &self.title)
            .field("subtitle", &self.subtitle)
            .field("base_score", &self.base_score)
            .field("provider_id", &self.provider_id)
            .field("origin_raw_query", &self.origin_raw_query)
            .finish()
    }
}

/// Action that does nothing and keeps the window open. Used by informational
/// entries (context menu provider info, history rows before re-run).
pub fn noop_action() -> ResultAction {
    Arc::new(|| Ok(false))
}

#[cfg(test)]
mod tests {
    use super::{noop_action, SearchResult};

    #[test]
    fn record_key_combines_provider_and_identity_fields() {
        let result = SearchResult::new("Notes", "Open notes", 10, "files", "not", noop_action());
        assert_eq!(result.record_key(), "files|Notes|Open notes");
    }

    #[test]
    fn noop_action_keeps_window_open() {
        let action = noop_action();
        assert_eq!(action().expect("noop should not fail"), false);
    }
}
