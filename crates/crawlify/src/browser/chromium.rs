//! Chromium driver built on chromiumoxide

use super::{BrowserDriver, LaunchOptions, PageSession, WaitUntil};
use crate::error::BrowserError;
use async_trait::async_trait;
use chromiumoxide::auth::Credentials;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Launches a headless Chromium per page session
#[derive(Debug, Clone, Default)]
pub struct ChromiumDriver {
    executable: Option<PathBuf>,
}

impl ChromiumDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific Chrome/Chromium binary instead of auto-detection
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    fn config(&self, options: &LaunchOptions) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        if let Some(proxy) = &options.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy.server));
        }
        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn open(&self, options: &LaunchOptions) -> Result<Box<dyn PageSession>, BrowserError> {
        let config = self.config(options)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromiumSession {
            browser: Some(browser),
            context_id: None,
            page: None,
            handler: Some(handler),
        };

        if let Err(e) = session.prepare(options).await {
            super::release(&mut session, "about:blank").await;
            return Err(e);
        }

        Ok(Box::new(session))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    context_id: Option<BrowserContextId>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

fn protocol<E: std::fmt::Display>(e: E) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}

impl ChromiumSession {
    async fn prepare(&mut self, options: &LaunchOptions) -> Result<(), BrowserError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| BrowserError::Launch("browser not running".to_string()))?;

        let context = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(protocol)?;
        let context_id = context.result.browser_context_id.clone();
        self.context_id = Some(context_id.clone());

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(BrowserError::Protocol)?;
        let page = browser.new_page(target).await.map_err(protocol)?;

        page.execute(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await
            .map_err(protocol)?;

        if let Some(proxy) = &options.proxy {
            if let Some(username) = &proxy.username {
                page.authenticate(Credentials {
                    username: username.clone(),
                    password: proxy.password.clone().unwrap_or_default(),
                })
                .await
                .map_err(protocol)?;
            }
        }

        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&Page, BrowserError> {
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::Protocol("page already closed".to_string()))
    }

    async fn navigate_inner(&self, url: &str, wait_until: WaitUntil) -> Result<(), BrowserError> {
        let page = self.page()?;
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(protocol)?;
        let mut events = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(protocol)?;

        let navigation = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        if let Some(error) = &navigation.result.error_text {
            return Err(BrowserError::Navigation(error.clone()));
        }

        let frame_id = navigation.result.frame_id.clone();
        let loader_id = navigation.result.loader_id.clone();
        let wanted = wait_until.lifecycle_event();

        while let Some(event) = events.next().await {
            if event.name != wanted || event.frame_id != frame_id {
                continue;
            }
            if let Some(loader) = &loader_id {
                if &event.loader_id != loader {
                    continue;
                }
            }
            return Ok(());
        }

        Err(BrowserError::Navigation(
            "page closed before navigation completed".to_string(),
        ))
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(
        &mut self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Option<String>, BrowserError> {
        tokio::time::timeout(timeout, self.navigate_inner(url, wait_until))
            .await
            .map_err(|_| BrowserError::NavigationTimeout(timeout.as_millis() as u64))??;

        let content_type = self
            .page()?
            .evaluate("document.contentType")
            .await
            .ok()
            .and_then(|v| v.into_value::<String>().ok())
            .filter(|ct| !ct.is_empty());
        Ok(content_type)
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.page()?.content().await.map_err(protocol)
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), BrowserError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        let bytes = self.page()?.screenshot(params).await.map_err(protocol)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn close_page(&mut self) -> Result<(), BrowserError> {
        match self.page.take() {
            Some(page) => page.close().await.map_err(protocol),
            None => Ok(()),
        }
    }

    async fn close_context(&mut self) -> Result<(), BrowserError> {
        let (Some(browser), Some(id)) = (self.browser.as_ref(), self.context_id.take()) else {
            return Ok(());
        };
        browser
            .execute(DisposeBrowserContextParams::new(id))
            .await
            .map(|_| ())
            .map_err(protocol)
    }

    async fn close_browser(&mut self) -> Result<(), BrowserError> {
        let result = match self.browser.take() {
            Some(mut browser) => {
                let closed = browser.close().await.map(|_| ()).map_err(protocol);
                if let Err(e) = browser.wait().await {
                    debug!("Browser process did not exit cleanly: {}", e);
                }
                closed
            }
            None => Ok(()),
        };
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        result
    }
}
