//! Brave Search API backend

use super::{array_at, base_url, configured, http_client, normalize_item, send_json, SearchBackend};
use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::types::SearchResult;
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_BRAVE_BASE_URL: &str = "https://api.search.brave.com";

/// Brave rejects larger page sizes
const MAX_COUNT: usize = 20;

#[derive(Debug, Clone)]
pub struct BraveBackend {
    api_key: String,
    base_url: String,
    country: Option<String>,
    safesearch: Option<String>,
    timeout: Duration,
}

impl BraveBackend {
    pub fn from_settings(settings: &SearchSettings, timeout: Duration) -> Result<Self, SearchError> {
        let api_key = configured(&settings.brave_api_key).ok_or_else(|| {
            SearchError::Unavailable(
                "Search is unavailable because Brave API key is missing.".to_string(),
            )
        })?;
        Ok(Self {
            api_key,
            base_url: base_url(&settings.brave_base_url, DEFAULT_BRAVE_BASE_URL),
            country: configured(&settings.brave_country),
            safesearch: configured(&settings.brave_safesearch),
            timeout,
        })
    }
}

#[async_trait]
impl SearchBackend for BraveBackend {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchResult, SearchError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("count", limit.min(MAX_COUNT).to_string()),
        ];
        if let Some(country) = &self.country {
            params.push(("country", country.clone()));
        }
        if let Some(safesearch) = &self.safesearch {
            params.push(("safesearch", safesearch.clone()));
        }

        let client = http_client(self.timeout)?;
        let request = client
            .get(format!("{}/res/v1/web/search", self.base_url))
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&params);

        let mut body = send_json(request).await?;
        let results = array_at(&mut body, "/web/results")
            .into_iter()
            .map(|item| normalize_item(item, "description"))
            .collect();

        Ok(SearchResult::new(query, limit, results, None))
    }
}
