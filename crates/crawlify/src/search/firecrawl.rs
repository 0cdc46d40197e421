//! Firecrawl search backend (primary)

use super::{array_at, base_url, configured, http_client, normalize_item, send_json, SearchBackend};
use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::types::{ResultItem, SearchResult};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev";

/// Firecrawl `/v2/search` client
#[derive(Debug, Clone)]
pub struct FirecrawlBackend {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl FirecrawlBackend {
    pub fn from_settings(settings: &SearchSettings, timeout: Duration) -> Result<Self, SearchError> {
        let api_key = configured(&settings.firecrawl_api_key).ok_or_else(|| {
            SearchError::Unavailable(
                "Search is unavailable because Firecrawl API key is missing.".to_string(),
            )
        })?;
        Ok(Self {
            api_key,
            base_url: base_url(&settings.firecrawl_base_url, DEFAULT_FIRECRAWL_BASE_URL),
            timeout,
        })
    }
}

#[async_trait]
impl SearchBackend for FirecrawlBackend {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchResult, SearchError> {
        let client = http_client(self.timeout)?;
        let request = client
            .post(format!("{}/v2/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "query": query,
                "limit": limit,
                "sources": ["web"],
            }));

        let mut body = send_json(request).await?;
        if body.get("success") != Some(&Value::Bool(true)) {
            return Err(SearchError::unexpected());
        }

        let warning = body
            .get("warning")
            .and_then(Value::as_str)
            .map(str::to_string);
        let results = array_at(&mut body, "/data/web")
            .into_iter()
            .map(to_item)
            .collect();

        Ok(SearchResult::new(query, limit, results, warning))
    }
}

/// Map page metadata to snake_case keys and keep the remaining top-level fields
fn to_item(mut item: Map<String, Value>) -> ResultItem {
    let page = match item.remove("metadata") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let mut normalized = normalize_item(item, "description");

    let extra = std::mem::take(&mut normalized.metadata);
    let field = |key: &str| page.get(key).cloned().unwrap_or(Value::Null);
    normalized.metadata.insert("source_url".into(), field("sourceURL"));
    normalized.metadata.insert("status_code".into(), field("statusCode"));
    normalized.metadata.insert("error".into(), field("error"));
    for (key, value) in extra {
        normalized.metadata.entry(key).or_insert(value);
    }
    normalized
}
