//! Crawl orchestration
//!
//! This module provides the main entry point for crawling a URL. One crawl is
//! one plain fetch (the only step that can fail the request), an optional
//! browser render, then independent per-format extraction. A failing format
//! is reported inside its own slot and never affects its siblings.

use crate::browser::{BrowserDriver, BrowserRenderer, ChromiumDriver};
use crate::config::{Settings, SummarySettings};
use crate::convert::{MarkdownConverter, MARKDOWN_CONTENT_TYPE, MARKDOWN_ERROR_MESSAGE};
use crate::error::FetchError;
use crate::proxy::{self, ProxyDescriptor};
use crate::render::should_render;
use crate::screenshot::ScreenshotStore;
use crate::summary::Summarizer;
use crate::types::{CrawlRequest, CrawlResult, FormatKind, FormatPayload};
use crate::{extract, DEFAULT_USER_AGENT};
use reqwest::header::CONTENT_TYPE;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for the plain fetch
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Content type assumed for a rendered page that reports none
const DEFAULT_HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

const SCREENSHOT_ERROR_MESSAGE: &str = "Failed to capture screenshot.";

/// Builder for [`Crawler`]
#[derive(Clone)]
pub struct CrawlerBuilder {
    user_agent: String,
    timeout: Duration,
    proxy_url: Option<String>,
    converter: MarkdownConverter,
    summary: SummarySettings,
    driver: Option<Arc<dyn BrowserDriver>>,
    chrome_path: Option<PathBuf>,
    store: ScreenshotStore,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl CrawlerBuilder {
    /// Start from resolved settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: FETCH_TIMEOUT,
            proxy_url: settings.proxy_url.clone(),
            converter: MarkdownConverter::new(settings.converter_path.clone()),
            summary: settings.summary.clone(),
            driver: None,
            chrome_path: settings.chrome_path.clone(),
            store: ScreenshotStore::from_settings(&settings.screenshots),
        }
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Override the plain fetch timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the raw outbound proxy URL
    pub fn proxy_url(mut self, url: Option<String>) -> Self {
        self.proxy_url = url;
        self
    }

    pub fn converter(mut self, converter: MarkdownConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn summary(mut self, settings: SummarySettings) -> Self {
        self.summary = settings;
        self
    }

    /// Use a custom browser driver instead of Chromium
    pub fn browser_driver(mut self, driver: Arc<dyn BrowserDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn screenshot_store(mut self, store: ScreenshotStore) -> Self {
        self.store = store;
        self
    }

    /// Build the crawler
    pub fn build(self) -> Crawler {
        let driver = self.driver.unwrap_or_else(|| {
            let chromium = match self.chrome_path {
                Some(path) => ChromiumDriver::new().with_executable(path),
                None => ChromiumDriver::new(),
            };
            Arc::new(chromium)
        });

        Crawler {
            renderer: BrowserRenderer::new(driver, self.store, self.user_agent.clone()),
            summarizer: Summarizer::new(self.summary),
            converter: self.converter,
            proxy_url: self.proxy_url,
            user_agent: self.user_agent,
            timeout: self.timeout,
        }
    }
}

/// Turns a URL into the requested formats
#[derive(Clone)]
pub struct Crawler {
    user_agent: String,
    timeout: Duration,
    proxy_url: Option<String>,
    converter: MarkdownConverter,
    summarizer: Summarizer,
    renderer: BrowserRenderer,
}

impl Default for Crawler {
    fn default() -> Self {
        CrawlerBuilder::default().build()
    }
}

/// Working document after the optional render
struct Page {
    html: String,
    content_type: Option<String>,
}

impl Crawler {
    /// Create a new crawler builder
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::default()
    }

    pub fn from_settings(settings: &Settings) -> Self {
        CrawlerBuilder::from_settings(settings).build()
    }

    /// Screenshot store used by this crawler
    pub fn screenshot_store(&self) -> &ScreenshotStore {
        self.renderer.store()
    }

    /// Crawl a URL.
    ///
    /// Only the plain fetch can fail; every format failure is reported in place.
    pub async fn crawl(&self, request: CrawlRequest) -> Result<CrawlResult, FetchError> {
        let url = request.url.trim().to_string();
        if url.is_empty() {
            return Err(FetchError::MissingUrl);
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(FetchError::InvalidUrlScheme);
        }

        let formats = request.effective_formats();
        let proxy = proxy::resolve(self.proxy_url.as_deref());

        let page = self.fetch(&url, proxy.as_ref()).await?;
        let page = self.maybe_render(&url, page, proxy.as_ref()).await;

        debug!(url = %url, formats = ?formats, "Building formats");
        let payloads = self
            .build_formats(&url, &page, &formats, proxy.as_ref())
            .await;

        Ok(CrawlResult {
            id: format!("crawl_{}", uuid::Uuid::new_v4()),
            status: "completed".to_string(),
            url,
            fetched_at: crate::timestamp(),
            formats: payloads,
        })
    }

    async fn fetch(&self, url: &str, proxy: Option<&ProxyDescriptor>) -> Result<Page, FetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str());
        if let Some(proxy) = proxy {
            builder = builder.proxy(
                proxy
                    .http
                    .to_reqwest()
                    .map_err(FetchError::ClientBuildError)?,
            );
        }
        let client = builder.build().map_err(FetchError::ClientBuildError)?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Upstream returned non-success status");
            return Err(FetchError::Upstream {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let html = response.text().await.map_err(FetchError::from_reqwest)?;

        Ok(Page { html, content_type })
    }

    /// Replace the page with a browser render when it looks incomplete
    async fn maybe_render(
        &self,
        url: &str,
        page: Page,
        proxy: Option<&ProxyDescriptor>,
    ) -> Page {
        let text = extract::plain_text(&page.html);
        if !should_render(&page.html, &text, page.content_type.as_deref()) {
            return page;
        }

        debug!(url = %url, "Page looks client-rendered, trying browser");
        match self
            .renderer
            .render(url, proxy.map(|p| &p.browser))
            .await
        {
            Some(rendered) if !rendered.html.is_empty() => Page {
                html: rendered.html,
                content_type: rendered
                    .content_type
                    .or(page.content_type)
                    .or_else(|| Some(DEFAULT_HTML_CONTENT_TYPE.to_string())),
            },
            _ => page,
        }
    }

    async fn build_formats(
        &self,
        url: &str,
        page: &Page,
        formats: &[FormatKind],
        proxy: Option<&ProxyDescriptor>,
    ) -> BTreeMap<FormatKind, FormatPayload> {
        let wants = |kind: FormatKind| formats.contains(&kind);
        let wants_summary = wants(FormatKind::Summary);
        let text = extract::plain_text(&page.html);

        // Markdown is computed at most once and shared by markdown and summary.
        let markdown_task = async {
            if wants(FormatKind::Markdown) || wants_summary {
                match self.converter.convert(&page.html).await {
                    Ok(md) => Some(md),
                    Err(e) => {
                        warn!(url = %url, "Markdown conversion failed: {}", e);
                        None
                    }
                }
            } else {
                None
            }
        };
        let screenshot_task = async {
            if !wants(FormatKind::Screenshot) {
                return None;
            }
            Some(
                match self
                    .renderer
                    .screenshot(url, proxy.map(|p| &p.browser))
                    .await
                {
                    Ok(file) => FormatPayload::Screenshot {
                        url: file.url,
                        content_type: file.content_type,
                        captured_at: file.captured_at,
                    },
                    Err(e) => {
                        warn!(url = %url, "Screenshot failed: {}", e);
                        FormatPayload::failed(SCREENSHOT_ERROR_MESSAGE)
                    }
                },
            )
        };
        // With plain text available the summary does not wait for markdown.
        let early_summary_task = async {
            if wants_summary && !text.is_empty() {
                Some(self.summarizer.summarize(url, &text).await)
            } else {
                None
            }
        };

        let (markdown, screenshot, early_summary) =
            tokio::join!(markdown_task, screenshot_task, early_summary_task);

        let summary = match early_summary {
            Some(payload) => Some(payload),
            None if wants_summary => Some(
                self.summarizer
                    .summarize(url, markdown.as_deref().unwrap_or_default())
                    .await,
            ),
            None => None,
        };

        let mut payloads = BTreeMap::new();
        for kind in formats {
            let payload = match kind {
                FormatKind::Html => FormatPayload::Content {
                    content: page.html.clone(),
                    content_type: page.content_type.clone(),
                },
                FormatKind::Markdown => match &markdown {
                    Some(md) => FormatPayload::Content {
                        content: md.clone(),
                        content_type: Some(MARKDOWN_CONTENT_TYPE.to_string()),
                    },
                    None => FormatPayload::failed(MARKDOWN_ERROR_MESSAGE),
                },
                FormatKind::Summary => match &summary {
                    Some(payload) => payload.clone(),
                    None => continue,
                },
                FormatKind::Links => FormatPayload::links(extract::links(&page.html, url)),
                FormatKind::Screenshot => match &screenshot {
                    Some(payload) => payload.clone(),
                    None => continue,
                },
            };
            payloads.insert(*kind, payload);
        }
        payloads
    }
}
