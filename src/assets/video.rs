//! Video stream extraction and remuxing via external tools
//!
//! Video-hosted assets cannot be streamed directly: the host serves separate
//! video-only and audio-only elementary streams. A [`VideoHandler`] fetches
//! each stream to a temporary file and remuxes them into one container with
//! a stream copy, never re-encoding.

use crate::config::ToolsConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

/// Which elementary stream of a video resource to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamSelector {
    /// The video-only stream
    VideoOnly,
    /// The audio-only stream
    AudioOnly,
}

/// Backend for fetching and remuxing video-hosted assets.
#[async_trait]
pub trait VideoHandler: Send + Sync {
    /// Fetch one elementary stream of `url` to `dest`.
    async fn fetch_stream(&self, url: &str, selector: StreamSelector, dest: &Path) -> Result<()>;

    /// Remux the two elementary streams into `dest` without re-encoding.
    async fn remux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<()>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Handler backed by external `yt-dlp` and `ffmpeg` binaries.
pub struct CliVideoHandler {
    ytdlp_path: PathBuf,
    ffmpeg_path: PathBuf,
}

impl CliVideoHandler {
    /// Create a handler with explicit binary paths.
    pub fn new(ytdlp_path: PathBuf, ffmpeg_path: PathBuf) -> Self {
        Self {
            ytdlp_path,
            ffmpeg_path,
        }
    }

    /// Attempt to find both binaries in PATH.
    pub fn from_path() -> Option<Self> {
        let ytdlp = which::which("yt-dlp").ok()?;
        let ffmpeg = which::which("ffmpeg").ok()?;
        Some(Self::new(ytdlp, ffmpeg))
    }
}

#[async_trait]
impl VideoHandler for CliVideoHandler {
    async fn fetch_stream(&self, url: &str, selector: StreamSelector, dest: &Path) -> Result<()> {
        // Prefer webm streams so the remux below stays a pure container copy.
        let format = match selector {
            StreamSelector::VideoOnly => "bestvideo[ext=webm]/bestvideo",
            StreamSelector::AudioOnly => "bestaudio[ext=webm]/bestaudio",
        };
        let output = Command::new(&self.ytdlp_path)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("-f")
            .arg(format)
            .arg("-o")
            .arg(dest)
            .arg(url)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("failed to execute yt-dlp: {e}")))?;
        if !output.status.success() {
            return Err(Error::ExternalTool(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn remux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<()> {
        // -f webm because dest may carry a temp suffix ffmpeg can't infer from.
        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-c")
            .arg("copy")
            .arg("-f")
            .arg("webm")
            .arg(dest)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("failed to execute ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(Error::ExternalTool(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-ytdlp-ffmpeg"
    }
}

/// Fallback used when the external tools are unavailable.
///
/// Every operation fails with a clear error, so a run only aborts if it
/// actually encounters a video-hosted asset.
pub struct NoOpVideoHandler;

#[async_trait]
impl VideoHandler for NoOpVideoHandler {
    async fn fetch_stream(&self, _url: &str, _selector: StreamSelector, _dest: &Path) -> Result<()> {
        Err(missing_tools())
    }

    async fn remux(&self, _video: &Path, _audio: &Path, _dest: &Path) -> Result<()> {
        Err(missing_tools())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

fn missing_tools() -> Error {
    Error::ExternalTool(
        "yt-dlp/ffmpeg not found; install them or set their paths in the tools configuration"
            .to_string(),
    )
}

/// Resolve a handler from configuration.
///
/// Explicit paths win; otherwise PATH is searched when `search_path` is set.
/// When either binary is missing the no-op handler is returned and video
/// assets will fail at download time.
pub fn resolve_handler(tools: &ToolsConfig) -> Arc<dyn VideoHandler> {
    let ytdlp = tools.ytdlp_path.clone().or_else(|| {
        tools
            .search_path
            .then(|| which::which("yt-dlp").ok())
            .flatten()
    });
    let ffmpeg = tools.ffmpeg_path.clone().or_else(|| {
        tools
            .search_path
            .then(|| which::which("ffmpeg").ok())
            .flatten()
    });
    match (ytdlp, ffmpeg) {
        (Some(ytdlp), Some(ffmpeg)) => Arc::new(CliVideoHandler::new(ytdlp, ffmpeg)),
        _ => {
            tracing::warn!("yt-dlp/ffmpeg not found; video assets will fail to download");
            Arc::new(NoOpVideoHandler)
        }
    }
}
