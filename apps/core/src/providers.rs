use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::matcher::fuzzy_match;
use crate::model::{ActionError, ResultAction, SearchResult};
use crate::plugin::{Provider, ProviderError, ProviderMetadata};
use crate::query::Query;

/// Launch action shared by the built-in providers: validate the target path
/// up front and ask the window to close on success.
fn launch_action(path: &str) -> ResultAction {
    let path = path.to_string();
    Arc::new(move || {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ActionError::new("empty launch path"));
        }
        if !Path::new(trimmed).exists() {
            return Err(ActionError::new(format!("path does not exist: {trimmed}")));
        }
        Ok(true)
    })
}

/// Scores candidates against the pattern (best of title/subtitle), keeps the
/// matches, orders them by descending score with insertion-order tiebreak and
/// cuts to the provider's top-N.
fn top_matches<T>(
    items: &[T],
    pattern: &str,
    limit: usize,
    texts: impl Fn(&T) -> (String, String),
) -> Vec<(i64, usize)> {
    let mut scored: Vec<(i64, usize)> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let (title, subtitle) = texts(item);
            let title_score = fuzzy_match(pattern, &title).map(|m| m.score);
            let subtitle_score = fuzzy_match(pattern, &subtitle).map(|m| m.score);
            match (title_score, subtitle_score) {
                (None, None) => None,
                (a, b) => Some((a.unwrap_or(0).max(b.unwrap_or(0)), index)),
            }
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.truncate(limit);
    scored
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub path: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    entries: Vec<CatalogEntry>,
}

/// Global provider over a static application catalog, optionally loaded from
/// a JSON file. The catalog is small and in-memory, so invocations are fast
/// and never check the token; the stale-result guard covers them.
#[derive(Debug)]
pub struct AppCatalogProvider {
    metadata: ProviderMetadata,
    entries: Vec<CatalogEntry>,
    limit: usize,
}

impl AppCatalogProvider {
    pub fn new(entries: Vec<CatalogEntry>, limit: usize) -> Self {
        Self {
            metadata: ProviderMetadata::global("apps", "Applications"),
            entries,
            limit,
        }
    }

    pub fn from_json_file(path: &Path, limit: usize) -> Result<Self, ProviderError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::failed(format!("catalog read failed: {e}")))?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::failed(format!("catalog parse failed: {e}")))?;
        Ok(Self::new(file.entries, limit))
    }

    pub fn deterministic_fixture(limit: usize) -> Self {
        Self::new(
            vec![
                CatalogEntry {
                    title: "Visual Studio Code".to_string(),
                    subtitle: "Code editor".to_string(),
                    path: "/usr/bin/code".to_string(),
                    icon: String::new(),
                },
                CatalogEntry {
                    title: "Terminal".to_string(),
                    subtitle: "Shell".to_string(),
                    path: "/usr/bin/terminal".to_string(),
                    icon: String::new(),
                },
            ],
            limit,
        )
    }
}

impl Provider for AppCatalogProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn query(
        &self,
        query: &Query,
        _cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let pattern = query.search_terms.trim();
        if pattern.is_empty() {
            return Ok(Vec::new());
        }

        let ranked = top_matches(&self.entries, pattern, self.limit, |entry| {
            (entry.title.clone(), entry.subtitle.clone())
        });

        Ok(ranked
            .into_iter()
            .map(|(score, index)| {
                let entry = &self.entries[index];
                SearchResult::new(
                    entry.title.clone(),
                    entry.subtitle.clone(),
                    score,
                    self.metadata.id.clone(),
                    query.raw_text.clone(),
                    launch_action(&entry.path),
                )
                .with_icon(entry.icon.clone())
            })
            .collect())
    }
}

/// Global provider that walks a directory tree and matches file names. The
/// walk can be long, so the token is checked between entries; a cancelled
/// walk reports `Cancelled` and the dispatcher treats it as silence.
pub struct FileScanProvider {
    metadata: ProviderMetadata,
    root: PathBuf,
    limit: usize,
}

impl FileScanProvider {
    pub fn new(root: PathBuf, limit: usize) -> Self {
        Self {
            metadata: ProviderMetadata::global("files", "Files"),
            root,
            limit,
        }
    }
}

impl Provider for FileScanProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn query(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let pattern = query.search_terms.trim();
        if pattern.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<(String, PathBuf)> = Vec::new();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            candidates.push((name, entry.into_path()));
        }

        let ranked = top_matches(&candidates, pattern, self.limit, |(name, path)| {
            (name.clone(), path.to_string_lossy().into_owned())
        });

        Ok(ranked
            .into_iter()
            .map(|(score, index)| {
                let (name, path) = &candidates[index];
                let path_text = path.to_string_lossy().into_owned();
                SearchResult::new(
                    name.clone(),
                    path_text.clone(),
                    score,
                    self.metadata.id.clone(),
                    query.raw_text.clone(),
                    launch_action(&path_text),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{launch_action, top_matches, AppCatalogProvider};
    use crate::plugin::Provider;
    use crate::query::Query;
    use std::collections::BTreeSet;
    use tokio_util::sync::CancellationToken;

    fn query(raw: &str) -> Query {
        Query::parse(raw, &BTreeSet::new()).expect("query should parse")
    }

    #[test]
    fn catalog_provider_matches_and_scores() {
        let provider = AppCatalogProvider::deterministic_fixture(5);
        let results = provider
            .query(&query("code"), &CancellationToken::new())
            .expect("query should succeed");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Visual Studio Code");
        assert!(results[0].base_score > 0);
        assert_eq!(results[0].provider_id, "apps");
        assert_eq!(results[0].origin_raw_query, "code");
    }

    #[test]
    fn catalog_provider_returns_nothing_for_empty_terms() {
        let provider = AppCatalogProvider::deterministic_fixture(5);
        let query = Query {
            raw_text: "apps".to_string(),
            keyword: "apps".to_string(),
            search_terms: String::new(),
        };
        let results = provider
            .query(&query, &CancellationToken::new())
            .expect("query should succeed");
        assert!(results.is_empty());
    }

    #[test]
    fn top_matches_truncates_and_orders_by_score() {
        let items = vec!["terminal", "term paper", "terraform"];
        let ranked = top_matches(&items, "term", 2, |item| (item.to_string(), String::new()));
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].0 >= ranked[1].0);
    }

    #[test]
    fn launch_action_rejects_missing_path() {
        let action = launch_action("/definitely/not/a/real/path");
        assert!(action().is_err());
    }

    #[test]
    fn launch_action_closes_window_for_existing_path() {
        let dir = std::env::temp_dir();
        let action = launch_action(dir.to_string_lossy().as_ref());
        assert_eq!(action().expect("existing path should launch"), true);
    }
}
