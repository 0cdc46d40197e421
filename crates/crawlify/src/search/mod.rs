//! Web search across pluggable backends
//!
//! Design: each backend implements [`SearchBackend`] and normalizes its
//! response into [`SearchResult`]. [`SearchService`] picks the backend from
//! [`SearchSettings`] on every call, so an unknown selector fails before any
//! network traffic.

mod brave;
mod firecrawl;
mod searxng;
mod tavily;

pub use brave::BraveBackend;
pub use firecrawl::FirecrawlBackend;
pub use searxng::SearxngBackend;
pub use tavily::TavilyBackend;

use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::types::{ResultItem, SearchRequest, SearchResult};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for one backend call
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// A web search provider
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Unique identifier for this backend (for logging)
    fn name(&self) -> &'static str;

    /// Run `query` and return at most `limit` normalized results
    async fn search(&self, query: &str, limit: usize) -> Result<SearchResult, SearchError>;
}

/// Known search backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchBackendKind {
    #[default]
    Firecrawl,
    Brave,
    Tavily,
    Searxng,
}

impl SearchBackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            SearchBackendKind::Firecrawl => "firecrawl",
            SearchBackendKind::Brave => "brave",
            SearchBackendKind::Tavily => "tavily",
            SearchBackendKind::Searxng => "searxng",
        }
    }

    /// Resolve the configured selector; blank or absent selects the primary backend
    pub fn select(raw: Option<&str>) -> Result<Self, SearchError> {
        match raw.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(Self::default()),
            Some(value) => value.parse(),
        }
    }
}

impl FromStr for SearchBackendKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firecrawl" => Ok(SearchBackendKind::Firecrawl),
            "brave" => Ok(SearchBackendKind::Brave),
            "tavily" => Ok(SearchBackendKind::Tavily),
            "searxng" => Ok(SearchBackendKind::Searxng),
            _ => Err(SearchError::Unavailable(format!(
                "Unsupported search backend: {}",
                s.trim()
            ))),
        }
    }
}

/// Entry point for searches, configured once at startup
#[derive(Debug, Clone, Default)]
pub struct SearchService {
    settings: SearchSettings,
    timeout: Option<Duration>,
}

impl SearchService {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            settings,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the configured backend without touching the network
    pub fn backend(&self) -> Result<Box<dyn SearchBackend>, SearchError> {
        let kind = SearchBackendKind::select(self.settings.backend.as_deref())?;
        let timeout = self.timeout.unwrap_or(SEARCH_TIMEOUT);
        let backend: Box<dyn SearchBackend> = match kind {
            SearchBackendKind::Firecrawl => {
                Box::new(FirecrawlBackend::from_settings(&self.settings, timeout)?)
            }
            SearchBackendKind::Brave => {
                Box::new(BraveBackend::from_settings(&self.settings, timeout)?)
            }
            SearchBackendKind::Tavily => {
                Box::new(TavilyBackend::from_settings(&self.settings, timeout)?)
            }
            SearchBackendKind::Searxng => {
                Box::new(SearxngBackend::from_settings(&self.settings, timeout)?)
            }
        };
        Ok(backend)
    }

    /// Search the web with the configured backend
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult, SearchError> {
        let query = request.query.trim();
        let limit = request.effective_limit();
        let backend = self.backend()?;

        debug!(backend = backend.name(), query = %query, limit, "Searching");
        let mut result = backend.search(query, limit).await.inspect_err(|e| {
            warn!(backend = backend.name(), "Search failed: {}", e);
        })?;

        // count always equals results.len() and never exceeds limit
        result.results.truncate(limit);
        result.count = result.results.len();
        Ok(result)
    }
}

/// Settings value with blanks treated as unset
pub(crate) fn configured(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn base_url(value: &Option<String>, default: &str) -> String {
    configured(value)
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| {
            warn!("Failed to build search client: {}", e);
            SearchError::unexpected()
        })
}

/// Send a request, requiring a 2xx status and a JSON object body
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
) -> Result<Map<String, Value>, SearchError> {
    let response = request.send().await.map_err(SearchError::from_reqwest)?;
    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::upstream(status.as_u16()));
    }

    match response.json::<Value>().await {
        Ok(Value::Object(body)) => Ok(body),
        Ok(_) => Err(SearchError::unexpected()),
        Err(e) => {
            warn!("Search response was not valid JSON: {}", e);
            Err(SearchError::unexpected())
        }
    }
}

/// Items of the array at `pointer`; anything else yields nothing
pub(crate) fn array_at(body: &mut Map<String, Value>, pointer: &str) -> Vec<Map<String, Value>> {
    let mut segments = pointer.split('/').filter(|s| !s.is_empty());
    let Some(first) = segments.next() else {
        return Vec::new();
    };
    let mut current = body.remove(first);
    for segment in segments {
        current = match current {
            Some(Value::Object(mut map)) => map.remove(segment),
            _ => None,
        };
    }
    match current {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Remove a string field; non-string values stay in place
pub(crate) fn take_string(item: &mut Map<String, Value>, key: &str) -> Option<String> {
    match item.get(key) {
        Some(Value::String(_)) => match item.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        Some(Value::Null) => {
            item.remove(key);
            None
        }
        _ => None,
    }
}

/// Normalize a backend item, folding every unmapped field into metadata
pub(crate) fn normalize_item(mut item: Map<String, Value>, description_key: &str) -> ResultItem {
    let title = take_string(&mut item, "title");
    let description = take_string(&mut item, description_key);
    let url = take_string(&mut item, "url");
    ResultItem {
        title,
        description,
        url,
        metadata: item,
    }
}
