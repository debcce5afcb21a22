use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::model::SearchResult;
use crate::query::Query;

/// Outcome of a provider invocation that did not produce a batch.
/// `Cancelled` is the expected generation-superseded case and is never
/// treated as a fault; anything else is logged and becomes an empty batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    Cancelled,
    Failed(String),
}

impl ProviderError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "invocation cancelled"),
            Self::Failed(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub id: String,
    pub name: String,
    /// Exclusive action keyword. A query starting with this token runs only
    /// this provider; global providers are suppressed for that generation.
    pub keyword: Option<String>,
    pub global: bool,
    pub disabled: bool,
}

impl ProviderMetadata {
    pub fn global(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            keyword: None,
            global: true,
            disabled: false,
        }
    }

    pub fn keyed(id: &str, name: &str, keyword: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            keyword: Some(keyword.to_string()),
            global: false,
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// A pluggable data source. `query` runs on the blocking worker pool and may
/// block on external lookups; long-running providers are expected to observe
/// the token at their own yield points. Providers that never check it run to
/// completion and their late batches are dropped by the stale-result guard.
pub trait Provider: Send + Sync {
    fn metadata(&self) -> &ProviderMetadata;

    fn query(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, ProviderError>;
}

/// Lookup surface over the loaded providers. Construction-time wiring; the
/// engine holds only shared references.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    pub fn by_id(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|provider| provider.metadata().id == id)
            .cloned()
    }

    pub fn by_keyword(&self, keyword: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|provider| provider.metadata().keyword.as_deref() == Some(keyword))
            .cloned()
    }

    pub fn global_providers(&self) -> Vec<Arc<dyn Provider>> {
        self.providers
            .iter()
            .filter(|provider| provider.metadata().global)
            .cloned()
            .collect()
    }

    /// All registered exclusive keywords, including those of disabled
    /// providers: a typed keyword still routes (and then yields nothing)
    /// rather than falling back to a noisy global search.
    pub fn keywords(&self) -> BTreeSet<String> {
        self.providers
            .iter()
            .filter_map(|provider| provider.metadata().keyword.clone())
            .collect()
    }

    /// Resolves the provider set for one generation under the exclusivity
    /// rule: a keyword query runs only its bound provider, a bare query runs
    /// every non-disabled global provider.
    pub fn eligible_for(&self, query: &Query) -> Vec<Arc<dyn Provider>> {
        if query.has_keyword() {
            return self
                .by_keyword(&query.keyword)
                .into_iter()
                .filter(|provider| !provider.metadata().disabled)
                .collect();
        }

        self.global_providers()
            .into_iter()
            .filter(|provider| !provider.metadata().disabled)
            .collect()
    }
}
