//! Screenshot storage and expiry
//!
//! Screenshots are written as `screenshot_<uuid>.png` into one directory and
//! referenced by URL. A background sweeper removes files older than a TTL.

use crate::config::ScreenshotSettings;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Content type of stored screenshots
pub const SCREENSHOT_CONTENT_TYPE: &str = "image/png";

/// Sweeps never run more often than this
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Metadata for a captured screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotFile {
    /// Public URL of the file
    pub url: String,
    pub content_type: String,
    /// RFC 3339 capture time
    pub captured_at: String,
}

/// Destination reserved for one capture
#[derive(Debug, Clone)]
pub struct ScreenshotTarget {
    pub file_name: String,
    pub path: PathBuf,
}

/// Directory-backed screenshot store
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    directory: PathBuf,
    url_prefix: String,
}

impl ScreenshotStore {
    pub fn new(directory: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ScreenshotSettings) -> Self {
        Self::new(settings.directory.clone(), settings.url_prefix.clone())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Ensure the directory exists and reserve a fresh file name
    pub async fn allocate(&self) -> std::io::Result<ScreenshotTarget> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let file_name = format!("screenshot_{}.png", uuid::Uuid::new_v4());
        Ok(ScreenshotTarget {
            path: self.directory.join(&file_name),
            file_name,
        })
    }

    /// Describe a completed capture
    pub fn describe(&self, target: &ScreenshotTarget) -> ScreenshotFile {
        ScreenshotFile {
            url: format!("{}/{}", self.url_prefix, target.file_name),
            content_type: SCREENSHOT_CONTENT_TYPE.to_string(),
            captured_at: crate::timestamp(),
        }
    }

    /// Delete a partially written capture; failures are logged only
    pub async fn discard(&self, target: &ScreenshotTarget) {
        match tokio::fs::remove_file(&target.path).await {
            Ok(()) => debug!(path = %target.path.display(), "Removed partial screenshot"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %target.path.display(), "Failed to remove partial screenshot: {}", e),
        }
    }
}

/// Remove `*.png` files older than `ttl` from `directory`.
///
/// A missing directory is not an error. Returns the number of removed files.
pub async fn prune_expired(directory: &Path, ttl: Duration) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < ttl {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    Ok(removed)
}

/// Run [`prune_expired`] now and then every `interval` on a background task
pub fn spawn_sweeper(
    directory: PathBuf,
    ttl: Duration,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match prune_expired(&directory, ttl).await {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "Pruned expired screenshots"),
                Err(e) => error!(dir = %directory.display(), "Failed to clean screenshots directory: {}", e),
            }
        }
    })
}
