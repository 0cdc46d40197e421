//! Crawlify - single-page web acquisition and web search
//!
//! This crate turns one URL into any combination of HTML, Markdown, a short
//! summary, a link list and a full-page screenshot, and normalizes results
//! from several web search APIs into one shape.
//!
//! ## Crawling
//!
//! [`Crawler::crawl`] fetches the page over plain HTTP. Pages that look
//! client-rendered are re-rendered in a headless browser through the
//! [`browser::BrowserDriver`] seam. Each requested format is then produced
//! independently; a failing format is reported in its own slot.
//!
//! ## Searching
//!
//! [`SearchService::search`] dispatches to one [`search::SearchBackend`]
//! (Firecrawl, Brave, Tavily or SearXNG) chosen by configuration.

pub mod browser;
pub mod client;
pub mod config;
mod convert;
mod error;
pub mod extract;
pub mod proxy;
pub mod render;
pub mod screenshot;
pub mod search;
mod summary;
mod tool;
mod types;

pub use client::{Crawler, CrawlerBuilder};
pub use config::Settings;
pub use convert::{MarkdownConverter, MARKDOWN_CONTENT_TYPE, MARKDOWN_ERROR_MESSAGE};
pub use error::{BrowserError, ConversionError, ErrorBody, FetchError, SearchError};
pub use search::{SearchBackend, SearchBackendKind, SearchService};
pub use summary::{Summarizer, SUMMARY_CONTENT_TYPE};
pub use tool::{Tool, ToolBuilder, ToolStatus};
pub use types::{
    CrawlRequest, CrawlResult, FailureStatus, FormatFailure, FormatKind, FormatPayload, Link,
    ResultItem, SearchRequest, SearchResult,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "CrawlifyBot/1.0";

/// Crawl tool description for LLM consumption
pub const CRAWL_TOOL_DESCRIPTION: &str = r#"Crawls a single web page and returns it in the requested formats.

- Formats: html, markdown, summary, links, screenshot (default: html)
- Client-rendered pages are rendered in a headless browser
- A failing format is reported in its own slot; the others still succeed"#;

/// Search tool description for LLM consumption
pub const SEARCH_TOOL_DESCRIPTION: &str = r#"Searches the web and returns normalized results.

- Each result has title, description, url and backend metadata
- At most `limit` results (1-10, default 5)"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# Crawlify Tools

## crawl

Fetches one URL and returns the requested formats.

### Input Parameters
- `url` (required): The URL to crawl (must be http:// or https://)
- `formats` (optional): Any of `html`, `markdown`, `summary`, `links`,
  `screenshot`. Unknown and duplicate values are ignored. Default: `["html"]`.

### Output Fields
- `id`: Opaque crawl id (`crawl_...`)
- `status`: Always `completed`
- `url`: The crawled URL
- `fetched_at`: RFC 3339 timestamp
- `formats`: One entry per requested format:
  - `html`, `markdown`, `summary`: `{content, content_type}`
  - `links`: `{items: [{url, text}], count}`
  - `screenshot`: `{url, content_type, captured_at}`
  - any failed format: `{status: "error", message}`

### Example
```json
{"url": "https://example.com", "formats": ["markdown", "links"]}
```

## search

### Input Parameters
- `query` (required): At least 2 characters
- `limit` (optional): 1 to 10, default 5

### Output Fields
- `query`, `limit`, `count`
- `results`: `[{title, description, url, metadata}]`
- `warning`: Backend warning, if any

### Example
```json
{"query": "rust async runtimes", "limit": 3}
```

## Error Handling
- Invalid URLs and unreachable or non-2xx pages fail the whole crawl
- Missing search credentials fail the search with a descriptive message
"#;

/// Current UTC time as RFC 3339 with millisecond precision
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
