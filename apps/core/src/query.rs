use std::collections::BTreeSet;

/// One keystroke's worth of parsed input. Immutable once built; a new
/// keystroke produces a new `Query` and a new dispatch generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub raw_text: String,
    pub keyword: String,
    pub search_terms: String,
}

impl Query {
    /// Splits on the first whitespace run. A leading token that exactly
    /// matches a registered exclusive keyword routes the whole query to the
    /// provider bound to it; otherwise the full input is the search text.
    /// Empty input yields no query and the caller clears the visible list.
    pub fn parse(raw_text: &str, registered_keywords: &BTreeSet<String>) -> Option<Self> {
        let trimmed = raw_text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim_start()),
            None => (trimmed, ""),
        };

        if registered_keywords.contains(head) {
            return Some(Self {
                raw_text: trimmed.to_string(),
                keyword: head.to_string(),
                search_terms: rest.to_string(),
            });
        }

        Some(Self {
            raw_text: trimmed.to_string(),
            keyword: String::new(),
            search_terms: trimmed.to_string(),
        })
    }

    pub fn has_keyword(&self) -> bool {
        !self.keyword.is_empty()
    }
}
