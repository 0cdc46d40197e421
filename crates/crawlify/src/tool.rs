//! Tool builder and contract for the crawl and search tools

use crate::client::{Crawler, CrawlerBuilder};
use crate::config::Settings;
use crate::error::{FetchError, SearchError};
use crate::search::SearchService;
use crate::types::{CrawlRequest, CrawlResult, FormatKind, SearchRequest, SearchResult};
use crate::{CRAWL_TOOL_DESCRIPTION, SEARCH_TOOL_DESCRIPTION, TOOL_LLMTXT};
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status update during tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStatus {
    /// Current phase (e.g., "validate", "crawl", "search", "complete")
    pub phase: String,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Estimated completion percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<f32>,
}

impl ToolStatus {
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            message: None,
            percent_complete: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_percent(mut self, percent: f32) -> Self {
        self.percent_complete = Some(percent);
        self
    }
}

/// Builder for configuring the tools
#[derive(Clone)]
pub struct ToolBuilder {
    crawler: CrawlerBuilder,
    search: SearchService,
    disabled_formats: Vec<FormatKind>,
}

impl Default for ToolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolBuilder {
    pub fn new() -> Self {
        Self::from_settings(&Settings::default())
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            crawler: CrawlerBuilder::from_settings(settings),
            search: SearchService::new(settings.search.clone()),
            disabled_formats: Vec::new(),
        }
    }

    /// Customize the underlying crawler
    pub fn crawler(mut self, builder: CrawlerBuilder) -> Self {
        self.crawler = builder;
        self
    }

    pub fn search_service(mut self, service: SearchService) -> Self {
        self.search = service;
        self
    }

    /// Hide a format from the crawl tool; requests for it are dropped
    pub fn disable_format(mut self, kind: FormatKind) -> Self {
        if !self.disabled_formats.contains(&kind) {
            self.disabled_formats.push(kind);
        }
        self
    }

    pub fn build(self) -> Tool {
        Tool {
            crawler: self.crawler.build(),
            search: self.search,
            disabled_formats: self.disabled_formats,
        }
    }
}

/// Configured crawl and search tools
#[derive(Clone)]
pub struct Tool {
    crawler: Crawler,
    search: SearchService,
    disabled_formats: Vec<FormatKind>,
}

impl Default for Tool {
    fn default() -> Self {
        ToolBuilder::new().build()
    }
}

impl Tool {
    pub fn builder() -> ToolBuilder {
        ToolBuilder::new()
    }

    pub fn crawler(&self) -> &Crawler {
        &self.crawler
    }

    pub fn crawl_description(&self) -> &'static str {
        CRAWL_TOOL_DESCRIPTION
    }

    pub fn search_description(&self) -> &'static str {
        SEARCH_TOOL_DESCRIPTION
    }

    /// Get full documentation (llmtxt)
    pub fn llmtxt(&self) -> &'static str {
        TOOL_LLMTXT
    }

    /// Input schema of the crawl tool, listing the enabled formats
    pub fn crawl_input_schema(&self) -> Value {
        let schema = schema_for!(CrawlRequest);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let enabled: Vec<Value> = FormatKind::ALL
            .into_iter()
            .filter(|kind| !self.disabled_formats.contains(kind))
            .map(|kind| Value::String(kind.as_str().to_string()))
            .collect();
        if let Some(formats) = value.pointer_mut("/properties/formats") {
            formats["items"] = serde_json::json!({ "type": "string", "enum": enabled });
        }

        value
    }

    pub fn crawl_output_schema(&self) -> Value {
        serde_json::to_value(schema_for!(CrawlResult)).unwrap_or_default()
    }

    pub fn search_input_schema(&self) -> Value {
        let mut value = serde_json::to_value(schema_for!(SearchRequest)).unwrap_or_default();
        if let Some(limit) = value.pointer_mut("/properties/limit") {
            limit["minimum"] = Value::from(1);
            limit["maximum"] = Value::from(SearchRequest::MAX_LIMIT);
        }
        if let Some(query) = value.pointer_mut("/properties/query") {
            query["minLength"] = Value::from(SearchRequest::MIN_QUERY_CHARS);
        }
        value
    }

    pub fn search_output_schema(&self) -> Value {
        serde_json::to_value(schema_for!(SearchResult)).unwrap_or_default()
    }

    /// Run the crawl tool
    pub async fn crawl(&self, req: CrawlRequest) -> Result<CrawlResult, FetchError> {
        self.crawl_with_status(req, |_| {}).await
    }

    /// Run the crawl tool with status updates
    pub async fn crawl_with_status<F>(
        &self,
        mut req: CrawlRequest,
        mut status_callback: F,
    ) -> Result<CrawlResult, FetchError>
    where
        F: FnMut(ToolStatus),
    {
        status_callback(ToolStatus::new("validate").with_percent(0.0));

        if !self.disabled_formats.is_empty() {
            if let Some(formats) = req.formats.as_mut() {
                formats.retain(|token| {
                    token
                        .parse::<FormatKind>()
                        .map(|kind| !self.disabled_formats.contains(&kind))
                        .unwrap_or(true)
                });
            }
        }

        status_callback(ToolStatus::new("crawl").with_message(req.url.clone()).with_percent(10.0));
        let result = self.crawler.crawl(req).await;
        status_callback(ToolStatus::new("complete").with_percent(100.0));

        result
    }

    /// Run the search tool
    pub async fn search(&self, req: SearchRequest) -> Result<SearchResult, SearchError> {
        req.validate()?;
        self.search.search(&req).await
    }
}
