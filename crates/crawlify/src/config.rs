//! Process-wide settings
//!
//! Settings are resolved once by the entry point and handed to component
//! constructors. Nothing in the library reads the environment on its own.

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the HTML to Markdown converter
pub const DEFAULT_CONVERTER_PATH: &str = "bin/html2markdown";

/// Default directory for stored screenshots
pub const DEFAULT_SCREENSHOT_DIR: &str = "public/screenshots";

/// Default public prefix for screenshot URLs
pub const DEFAULT_SCREENSHOT_URL_PREFIX: &str = "/screenshots";

/// Default chat-completion API base
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default summary model
pub const DEFAULT_SUMMARY_MODEL: &str = "google/gemini-2.5-flash-lite";

/// Screenshots older than this are removed by the sweeper
pub const DEFAULT_SCREENSHOT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// How often the sweeper runs
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Summary provider settings
#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }
}

/// Search backend settings
#[derive(Debug, Clone, Default)]
pub struct SearchSettings {
    /// Raw backend selector; `None` or blank selects the primary backend
    pub backend: Option<String>,
    pub firecrawl_api_key: Option<String>,
    pub firecrawl_base_url: Option<String>,
    pub brave_api_key: Option<String>,
    pub brave_base_url: Option<String>,
    pub brave_country: Option<String>,
    pub brave_safesearch: Option<String>,
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: Option<String>,
    pub tavily_search_depth: Option<String>,
    pub searxng_base_url: Option<String>,
    pub searxng_engines: Option<String>,
    pub searxng_categories: Option<String>,
    pub searxng_language: Option<String>,
}

/// Screenshot storage settings
#[derive(Debug, Clone)]
pub struct ScreenshotSettings {
    pub directory: PathBuf,
    pub url_prefix: String,
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for ScreenshotSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
            url_prefix: DEFAULT_SCREENSHOT_URL_PREFIX.to_string(),
            ttl: DEFAULT_SCREENSHOT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// All settings for a Crawlify process
#[derive(Debug, Clone)]
pub struct Settings {
    /// Raw outbound proxy URL
    pub proxy_url: Option<String>,
    /// External converter executable
    pub converter_path: PathBuf,
    /// Browser executable for the Chromium driver
    pub chrome_path: Option<PathBuf>,
    pub screenshots: ScreenshotSettings,
    pub summary: SummarySettings,
    pub search: SearchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_url: None,
            converter_path: PathBuf::from(DEFAULT_CONVERTER_PATH),
            chrome_path: None,
            screenshots: ScreenshotSettings::default(),
            summary: SummarySettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secs = |key: &str, default: Duration| {
            get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let defaults = Settings::default();

        Self {
            proxy_url: get("CRAWL_HTTP_PROXY"),
            converter_path: get("HTML2MARKDOWN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.converter_path),
            chrome_path: get("CHROME_PATH").map(PathBuf::from),
            screenshots: ScreenshotSettings {
                directory: get("SCREENSHOT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.screenshots.directory),
                url_prefix: get("SCREENSHOT_URL_PREFIX")
                    .map(|p| p.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.screenshots.url_prefix),
                ttl: secs("SCREENSHOT_TTL_SECS", DEFAULT_SCREENSHOT_TTL),
                sweep_interval: secs("SCREENSHOT_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL),
            },
            summary: SummarySettings {
                api_key: get("OPENROUTER_API_KEY"),
                base_url: get("OPENROUTER_BASE_URL").unwrap_or(defaults.summary.base_url),
                model: get("SUMMARY_MODEL").unwrap_or(defaults.summary.model),
            },
            search: SearchSettings {
                backend: get("SEARCH_BACKEND"),
                firecrawl_api_key: get("FIRECRAWL_API_KEY"),
                firecrawl_base_url: get("FIRECRAWL_BASE_URL"),
                brave_api_key: get("BRAVE_API_KEY"),
                brave_base_url: get("BRAVE_BASE_URL"),
                brave_country: get("BRAVE_COUNTRY"),
                brave_safesearch: get("BRAVE_SAFESEARCH"),
                tavily_api_key: get("TAVILY_API_KEY"),
                tavily_base_url: get("TAVILY_BASE_URL"),
                tavily_search_depth: get("TAVILY_SEARCH_DEPTH"),
                searxng_base_url: get("SEARXNG_BASE_URL"),
                searxng_engines: get("SEARXNG_ENGINES"),
                searxng_categories: get("SEARXNG_CATEGORIES"),
                searxng_language: get("SEARXNG_LANGUAGE"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert!(settings.proxy_url.is_none());
        assert_eq!(settings.converter_path, PathBuf::from(DEFAULT_CONVERTER_PATH));
        assert_eq!(settings.screenshots.url_prefix, "/screenshots");
        assert_eq!(settings.screenshots.ttl, DEFAULT_SCREENSHOT_TTL);
        assert_eq!(settings.summary.model, DEFAULT_SUMMARY_MODEL);
        assert!(settings.summary.api_key.is_none());
        assert!(settings.search.backend.is_none());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENROUTER_API_KEY", "   "),
            ("SEARCH_BACKEND", ""),
        ]));
        assert!(settings.summary.api_key.is_none());
        assert!(settings.search.backend.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("CRAWL_HTTP_PROXY", " http://proxy:3128 "),
            ("SCREENSHOT_URL_PREFIX", "/shots/"),
            ("SCREENSHOT_TTL_SECS", "60"),
            ("SEARCH_BACKEND", "brave"),
            ("BRAVE_API_KEY", "k"),
        ]));
        assert_eq!(settings.proxy_url.as_deref(), Some("http://proxy:3128"));
        assert_eq!(settings.screenshots.url_prefix, "/shots");
        assert_eq!(settings.screenshots.ttl, Duration::from_secs(60));
        assert_eq!(settings.search.backend.as_deref(), Some("brave"));
        assert_eq!(settings.search.brave_api_key.as_deref(), Some("k"));
    }
}
