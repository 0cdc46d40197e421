//! HTML to Markdown conversion through an external process
//!
//! The converter is invoked without arguments, reads HTML on stdin and writes
//! Markdown on stdout. Each call spawns one process with a hard deadline.

use crate::error::ConversionError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Content type reported for converted Markdown
pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

/// Message used when the converter fails without diagnostics
pub const MARKDOWN_ERROR_MESSAGE: &str = "Failed to convert HTML to Markdown.";

/// Hard deadline for one conversion
pub const CONVERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the external HTML to Markdown converter
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    program: PathBuf,
    timeout: Duration,
}

impl MarkdownConverter {
    /// Create a converter for the given executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: CONVERSION_TIMEOUT,
        }
    }

    /// Override the conversion deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Convert HTML to Markdown.
    ///
    /// Output is stripped of trailing newlines and otherwise returned verbatim.
    pub async fn convert(&self, html: &str) -> Result<String, ConversionError> {
        if !is_executable(&self.program) {
            return Err(ConversionError::NotExecutable);
        }

        let mut command = Command::new(&self.program);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so helpers spawned by a wrapper script die with it
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(ConversionError::Spawn)?;
        let group = child.id();

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Feed stdin while the output pipes drain, so a full pipe can't stall either side.
        let input = html.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(&input).await {
                    debug!("Converter stdin closed early: {}", e);
                    return;
                }
                if let Err(e) = stdin.shutdown().await {
                    debug!("Converter stdin shutdown failed: {}", e);
                }
            }
        });
        let mut stdout_task = tokio::spawn(drain(stdout));
        let mut stderr_task = tokio::spawn(drain(stderr));

        // One deadline covers the exit and both pipes reaching EOF.
        let run = async {
            let status = child.wait().await.map_err(ConversionError::Io)?;
            // Leftover descendants would keep the output pipes open
            kill_group(group);
            let stdout = join_output(&mut stdout_task).await?;
            let stderr = join_output(&mut stderr_task).await?;
            Ok::<_, ConversionError>((status, stdout, stderr))
        };
        let outcome = tokio::time::timeout(self.timeout, run).await;

        // Exit status is authoritative; write failures after exit are irrelevant.
        writer.abort();

        let (status, stdout_bytes, stderr_bytes) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    program = %self.program.display(),
                    "Converter exceeded {} ms, killing",
                    self.timeout.as_millis()
                );
                kill_group(group);
                if let Err(e) = child.kill().await {
                    debug!("Converter already gone: {}", e);
                }
                stdout_task.abort();
                stderr_task.abort();
                return Err(ConversionError::TimedOut);
            }
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes).trim().to_string();
            return Err(ConversionError::Failed(if stderr.is_empty() {
                MARKDOWN_ERROR_MESSAGE.to_string()
            } else {
                stderr
            }));
        }

        let output = String::from_utf8_lossy(&stdout_bytes);
        Ok(output.trim_end_matches(['\r', '\n']).to_string())
    }
}

async fn drain<R>(reader: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

async fn join_output(
    task: &mut tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, ConversionError> {
    task.await
        .map_err(|e| ConversionError::Io(std::io::Error::other(e)))?
        .map_err(ConversionError::Io)
}

/// SIGKILL every process in the converter's group
#[cfg(unix)]
fn kill_group(group: Option<u32>) {
    let Some(pgid) = group.and_then(|id| libc::pid_t::try_from(id).ok()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; an empty group yields ESRCH.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_group: Option<u32>) {}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
