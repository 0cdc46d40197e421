//! Tavily search backend

use super::{array_at, base_url, configured, http_client, normalize_item, send_json, SearchBackend};
use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::types::SearchResult;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

pub const DEFAULT_SEARCH_DEPTH: &str = "basic";

#[derive(Debug, Clone)]
pub struct TavilyBackend {
    api_key: String,
    base_url: String,
    search_depth: String,
    timeout: Duration,
}

impl TavilyBackend {
    pub fn from_settings(settings: &SearchSettings, timeout: Duration) -> Result<Self, SearchError> {
        let api_key = configured(&settings.tavily_api_key).ok_or_else(|| {
            SearchError::Unavailable(
                "Search is unavailable because Tavily API key is missing.".to_string(),
            )
        })?;
        Ok(Self {
            api_key,
            base_url: base_url(&settings.tavily_base_url, DEFAULT_TAVILY_BASE_URL),
            search_depth: configured(&settings.tavily_search_depth)
                .unwrap_or_else(|| DEFAULT_SEARCH_DEPTH.to_string()),
            timeout,
        })
    }
}

#[async_trait]
impl SearchBackend for TavilyBackend {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchResult, SearchError> {
        let client = http_client(self.timeout)?;
        let request = client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "query": query,
                "max_results": limit,
                "search_depth": self.search_depth,
            }));

        let mut body = send_json(request).await?;
        let results = array_at(&mut body, "/results")
            .into_iter()
            .map(|item| normalize_item(item, "content"))
            .collect();

        Ok(SearchResult::new(query, limit, results, None))
    }
}
