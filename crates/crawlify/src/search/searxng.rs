//! SearXNG metasearch backend
//!
//! Needs only a base URL; the instance must have the JSON output format enabled.

use super::{array_at, configured, http_client, normalize_item, send_json, SearchBackend};
use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::types::SearchResult;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SearxngBackend {
    base_url: String,
    engines: Option<String>,
    categories: Option<String>,
    language: Option<String>,
    timeout: Duration,
}

impl SearxngBackend {
    pub fn from_settings(settings: &SearchSettings, timeout: Duration) -> Result<Self, SearchError> {
        let base_url = configured(&settings.searxng_base_url).ok_or_else(|| {
            SearchError::Unavailable(
                "Search is unavailable because SearXNG base URL is missing.".to_string(),
            )
        })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            engines: configured(&settings.searxng_engines),
            categories: configured(&settings.searxng_categories),
            language: configured(&settings.searxng_language),
            timeout,
        })
    }
}

#[async_trait]
impl SearchBackend for SearxngBackend {
    fn name(&self) -> &'static str {
        "searxng"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchResult, SearchError> {
        let mut params = vec![("q", query.to_string()), ("format", "json".to_string())];
        if let Some(engines) = &self.engines {
            params.push(("engines", engines.clone()));
        }
        if let Some(categories) = &self.categories {
            params.push(("categories", categories.clone()));
        }
        if let Some(language) = &self.language {
            params.push(("language", language.clone()));
        }

        let client = http_client(self.timeout)?;
        let request = client
            .get(format!("{}/search", self.base_url))
            .header("Accept", "application/json")
            .query(&params);

        let mut body = send_json(request).await?;
        let warning = unresponsive_warning(body.get("unresponsive_engines"));
        let results = array_at(&mut body, "/results")
            .into_iter()
            .map(|item| normalize_item(item, "content"))
            .collect();

        Ok(SearchResult::new(query, limit, results, warning))
    }
}

/// `[["google", "timeout"], ...]` becomes "Unresponsive engines: google (timeout)"
fn unresponsive_warning(value: Option<&Value>) -> Option<String> {
    let entries = value?.as_array()?;
    let names: Vec<String> = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(name) => Some(name.clone()),
            Value::Array(parts) => {
                let name = parts.first()?.as_str()?;
                Some(match parts.get(1).and_then(Value::as_str) {
                    Some(reason) if !reason.is_empty() => format!("{} ({})", name, reason),
                    _ => name.to_string(),
                })
            }
            _ => None,
        })
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(format!("Unresponsive engines: {}", names.join(", ")))
    }
}
