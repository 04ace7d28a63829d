//! Configuration types for universe-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Remote content source configuration
///
/// Identifies the versioned endpoint root and the locale segment appended to
/// it. All JSON endpoints are resolved relative to `<base_url>/<locale>`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Versioned endpoint root (default: the universe content API)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Locale segment (default: "en_us")
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            locale: default_locale(),
        }
    }
}

/// Download behavior configuration (directories, concurrency, timeouts)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Data directory holding the persisted dataset and assets (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum concurrent JSON entity fetches per batch (default: 25)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Maximum concurrent asset downloads per batch (default: 10)
    ///
    /// Doubles as a self-imposed ceiling against remote throttling; the
    /// source documents no rate limit.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Per-request timeout for the shared HTTP client (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl DownloadConfig {
    /// Directory assets are materialized into
    pub fn asset_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Path of the persisted JSON aggregate
    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join("raw.json")
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote content source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Validate the configuration, returning the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.source.base_url).is_err() {
            return Err(Error::Config {
                message: format!("base_url is not a valid URL: {}", self.source.base_url),
                key: Some("source.base_url".to_string()),
            });
        }
        if self.source.locale.is_empty() {
            return Err(Error::Config {
                message: "locale must not be empty".to_string(),
                key: Some("source.locale".to_string()),
            });
        }
        if self.download.max_concurrent_fetches == 0 {
            return Err(Error::Config {
                message: "max_concurrent_fetches must be at least 1".to_string(),
                key: Some("download.max_concurrent_fetches".to_string()),
            });
        }
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("download.max_concurrent_downloads".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://universe-meeps.leagueoflegends.com/v1".to_string()
}

fn default_locale() -> String {
    "en_us".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_concurrent_fetches() -> usize {
    25
}

fn default_max_concurrent_downloads() -> usize {
    10
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}
