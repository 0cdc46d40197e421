//! Core types for Crawlify

use crate::error::SearchError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Output format that can be requested for a crawl
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Raw (possibly rendered) HTML
    Html,
    /// Markdown produced by the external converter
    Markdown,
    /// LLM-generated summary
    Summary,
    /// Deduplicated absolute links
    Links,
    /// Full-page PNG screenshot
    Screenshot,
}

impl FormatKind {
    /// All known formats, in canonical order
    pub const ALL: [FormatKind; 5] = [
        FormatKind::Html,
        FormatKind::Markdown,
        FormatKind::Summary,
        FormatKind::Links,
        FormatKind::Screenshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKind::Html => "html",
            FormatKind::Markdown => "markdown",
            FormatKind::Summary => "summary",
            FormatKind::Links => "links",
            FormatKind::Screenshot => "screenshot",
        }
    }

    /// Normalize raw format tokens.
    ///
    /// Unknown and duplicate tokens are dropped, first occurrence wins.
    /// Falls back to `[Html]` when nothing is left.
    pub fn normalize<S: AsRef<str>>(tokens: &[S]) -> Vec<FormatKind> {
        let mut formats = Vec::with_capacity(tokens.len());
        for token in tokens {
            if let Ok(kind) = token.as_ref().parse::<FormatKind>() {
                if !formats.contains(&kind) {
                    formats.push(kind);
                }
            }
        }
        if formats.is_empty() {
            formats.push(FormatKind::Html);
        }
        formats
    }
}

impl FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unsupported format: {}", s))
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to crawl a single URL
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CrawlRequest {
    /// The URL to crawl (required, must be http:// or https://)
    pub url: String,

    /// Requested formats: html, markdown, summary, links, screenshot (default: html)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<String>>,
}

impl CrawlRequest {
    /// Create a new request with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Request an additional format
    pub fn format(mut self, kind: FormatKind) -> Self {
        self.formats
            .get_or_insert_with(Vec::new)
            .push(kind.as_str().to_string());
        self
    }

    /// Set raw format tokens
    pub fn formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Normalized list of formats to produce
    pub fn effective_formats(&self) -> Vec<FormatKind> {
        FormatKind::normalize(self.formats.as_deref().unwrap_or_default())
    }
}

/// A link found in the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    /// Absolute URL
    pub url: String,
    /// Whitespace-collapsed anchor text, null when empty
    pub text: Option<String>,
}

/// Marker serialized as `"error"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FailureStatus {
    Error,
}

/// Uniform failure shape for a single format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FormatFailure {
    pub status: FailureStatus,
    pub message: String,
}

impl FormatFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: FailureStatus::Error,
            message: message.into(),
        }
    }
}

/// Payload of a single requested format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FormatPayload {
    /// Failure isolated to this format
    Failed(FormatFailure),
    /// Text content (html, markdown, summary)
    Content {
        content: String,
        content_type: Option<String>,
    },
    /// Extracted links
    Links { items: Vec<Link>, count: usize },
    /// Stored screenshot reference
    Screenshot {
        url: String,
        content_type: String,
        captured_at: String,
    },
}

impl FormatPayload {
    pub fn failed(message: impl Into<String>) -> Self {
        FormatPayload::Failed(FormatFailure::new(message))
    }

    pub fn links(items: Vec<Link>) -> Self {
        FormatPayload::Links {
            count: items.len(),
            items,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FormatPayload::Failed(_))
    }

    /// Text content, if this is a content payload
    pub fn content(&self) -> Option<&str> {
        match self {
            FormatPayload::Content { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Failure message, if this is a failure payload
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            FormatPayload::Failed(failure) => Some(&failure.message),
            _ => None,
        }
    }
}

/// Result of a crawl
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrawlResult {
    /// Opaque id, prefixed with `crawl_`
    pub id: String,
    /// Always "completed"
    pub status: String,
    /// The crawled URL
    pub url: String,
    /// RFC 3339 timestamp of the fetch
    pub fetched_at: String,
    /// One payload per requested format
    pub formats: BTreeMap<FormatKind, FormatPayload>,
}

/// Request to search the web
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    /// Search query (at least 2 characters)
    pub query: String,

    /// Maximum number of results, 1 to 10 (default 5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub const DEFAULT_LIMIT: usize = 5;
    pub const MAX_LIMIT: usize = 10;
    pub const MIN_QUERY_CHARS: usize = 2;

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    /// Check the query length and limit range
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.query.trim().chars().count() < Self::MIN_QUERY_CHARS {
            return Err(SearchError::InvalidRequest(
                "The query field must be at least 2 characters.".to_string(),
            ));
        }
        match self.limit {
            Some(0) => Err(SearchError::InvalidRequest(
                "The limit field must be at least 1.".to_string(),
            )),
            Some(limit) if limit > Self::MAX_LIMIT => Err(SearchError::InvalidRequest(
                "The limit field may not be greater than 10.".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// A single normalized search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Backend-specific fields
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Normalized search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    pub query: String,
    pub limit: usize,
    pub count: usize,
    pub results: Vec<ResultItem>,
    pub warning: Option<String>,
}

impl SearchResult {
    /// Build a result, truncating to `limit` so that `count == results.len() <= limit`
    pub fn new(
        query: impl Into<String>,
        limit: usize,
        mut results: Vec<ResultItem>,
        warning: Option<String>,
    ) -> Self {
        results.truncate(limit);
        Self {
            query: query.into(),
            limit,
            count: results.len(),
            results,
            warning,
        }
    }
}
