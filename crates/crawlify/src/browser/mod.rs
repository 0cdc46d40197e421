//! Headless browser rendering and screenshots
//!
//! Design: [`BrowserDriver`] opens one isolated page per call (fresh browser,
//! context and page) and [`BrowserRenderer`] layers the navigation policy,
//! fallback semantics and guaranteed teardown on top of it.
//!
//! Navigation first waits for network idle; if that times out, it retries once
//! waiting only for DOMContentLoaded. Any other failure propagates.

mod chromium;

pub use chromium::ChromiumDriver;

use crate::error::BrowserError;
use crate::proxy::BrowserProxy;
use crate::screenshot::{ScreenshotFile, ScreenshotStore};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for the network-idle navigation attempt
pub const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(20);

/// Timeout for the DOMContentLoaded fallback attempt
pub const DOM_CONTENT_LOADED_TIMEOUT: Duration = Duration::from_secs(10);

/// Page lifecycle state a navigation waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    NetworkIdle,
    DomContentLoaded,
}

impl WaitUntil {
    /// Name of the matching CDP lifecycle event
    pub fn lifecycle_event(&self) -> &'static str {
        match self {
            WaitUntil::NetworkIdle => "networkIdle",
            WaitUntil::DomContentLoaded => "DOMContentLoaded",
        }
    }
}

/// Two-tier navigation timeouts
#[derive(Debug, Clone, Copy)]
pub struct NavigationPolicy {
    pub network_idle_timeout: Duration,
    pub dom_content_loaded_timeout: Duration,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            network_idle_timeout: NETWORK_IDLE_TIMEOUT,
            dom_content_loaded_timeout: DOM_CONTENT_LOADED_TIMEOUT,
        }
    }
}

/// Options for opening a page
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub user_agent: String,
    pub proxy: Option<BrowserProxy>,
}

/// Launches isolated browser pages
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Unique identifier for this driver (for logging)
    fn name(&self) -> &'static str;

    /// Launch a browser, create a fresh context and open a blank page in it.
    ///
    /// Implementations release anything they opened if a later step fails.
    async fn open(&self, options: &LaunchOptions) -> Result<Box<dyn PageSession>, BrowserError>;
}

/// One open page together with its context and browser
#[async_trait]
pub trait PageSession: Send {
    /// Navigate and wait for `wait_until`; returns the document content type.
    ///
    /// Must fail with [`BrowserError::NavigationTimeout`] when `timeout` elapses.
    async fn navigate(
        &mut self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Option<String>, BrowserError>;

    /// Serialized HTML of the current document
    async fn content(&mut self) -> Result<String, BrowserError>;

    /// Write a full-page PNG to `path`
    async fn screenshot(&mut self, path: &Path) -> Result<(), BrowserError>;

    async fn close_page(&mut self) -> Result<(), BrowserError>;

    async fn close_context(&mut self) -> Result<(), BrowserError>;

    async fn close_browser(&mut self) -> Result<(), BrowserError>;
}

/// HTML produced by a browser render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    pub content_type: Option<String>,
}

/// Renders pages and captures screenshots through a [`BrowserDriver`]
#[derive(Clone)]
pub struct BrowserRenderer {
    driver: Arc<dyn BrowserDriver>,
    store: ScreenshotStore,
    policy: NavigationPolicy,
    user_agent: String,
}

impl BrowserRenderer {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        store: ScreenshotStore,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            store,
            policy: NavigationPolicy::default(),
            user_agent: user_agent.into(),
        }
    }

    pub fn with_policy(mut self, policy: NavigationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &ScreenshotStore {
        &self.store
    }

    fn launch_options(&self, proxy: Option<&BrowserProxy>) -> LaunchOptions {
        LaunchOptions {
            user_agent: self.user_agent.clone(),
            proxy: proxy.cloned(),
        }
    }

    /// Render `url` in a browser.
    ///
    /// Returns `None` on any failure so the caller can keep its original fetch.
    pub async fn render(&self, url: &str, proxy: Option<&BrowserProxy>) -> Option<RenderedPage> {
        let mut session = match self.driver.open(&self.launch_options(proxy)).await {
            Ok(session) => session,
            Err(e) => {
                warn!(url = %url, driver = self.driver.name(), "Browser render unavailable: {}", e);
                return None;
            }
        };

        let result = async {
            let content_type = navigate_with_retry(session.as_mut(), url, &self.policy).await?;
            let html = session.content().await?;
            Ok::<_, BrowserError>(RenderedPage { html, content_type })
        }
        .await;

        release(session.as_mut(), url).await;

        match result {
            Ok(page) => Some(page),
            Err(e) => {
                warn!(url = %url, "Browser render failed, keeping fetched HTML: {}", e);
                None
            }
        }
    }

    /// Capture a full-page PNG of `url`.
    ///
    /// A partially written file is deleted before the error is returned.
    pub async fn screenshot(
        &self,
        url: &str,
        proxy: Option<&BrowserProxy>,
    ) -> Result<ScreenshotFile, BrowserError> {
        let target = self.store.allocate().await?;
        let mut session = self.driver.open(&self.launch_options(proxy)).await?;

        let result = async {
            navigate_with_retry(session.as_mut(), url, &self.policy).await?;
            session.screenshot(&target.path).await
        }
        .await;

        release(session.as_mut(), url).await;

        match result {
            Ok(()) => {
                debug!(url = %url, file = %target.file_name, "Captured screenshot");
                Ok(self.store.describe(&target))
            }
            Err(e) => {
                self.store.discard(&target).await;
                Err(e)
            }
        }
    }
}

/// Navigate waiting for network idle, falling back to DOMContentLoaded once on timeout
pub async fn navigate_with_retry(
    session: &mut dyn PageSession,
    url: &str,
    policy: &NavigationPolicy,
) -> Result<Option<String>, BrowserError> {
    match session
        .navigate(url, WaitUntil::NetworkIdle, policy.network_idle_timeout)
        .await
    {
        Err(BrowserError::NavigationTimeout(ms)) => {
            debug!(url = %url, "Network idle not reached after {} ms, retrying for DOMContentLoaded", ms);
            session
                .navigate(
                    url,
                    WaitUntil::DomContentLoaded,
                    policy.dom_content_loaded_timeout,
                )
                .await
        }
        other => other,
    }
}

/// Close page, context and browser; each step runs even if an earlier one failed
pub(crate) async fn release(session: &mut dyn PageSession, url: &str) {
    if let Err(e) = session.close_page().await {
        warn!(url = %url, "Failed to close page: {}", e);
    }
    if let Err(e) = session.close_context().await {
        warn!(url = %url, "Failed to close browser context: {}", e);
    }
    if let Err(e) = session.close_browser().await {
        warn!(url = %url, "Failed to close browser: {}", e);
    }
}
