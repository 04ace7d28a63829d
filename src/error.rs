//! Error types for universe-dl
//!
//! Every failure is fatal to the current scrape invocation: there is no
//! automatic retry and no partial result. The variants carry enough context
//! (entity, key/URL, pipeline stage) for the invocation surface to report a
//! single descriptive error and exit non-zero.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for universe-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for universe-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// A memoized fetch operation failed for one resolved locator.
    ///
    /// The cache is not written on failure, so a subsequent call retries.
    #[error("failed to fetch {entity} at {locator}: {source}")]
    Fetch {
        /// Entity the fetch operation retrieves (e.g., "champions")
        entity: String,
        /// Resolved URL the request was issued against
        locator: String,
        /// Underlying network, status, or decode failure
        #[source]
        source: Box<Error>,
    },

    /// A batch item's worker failed; the batch aborted without results.
    #[error("batch '{entity}' failed on item '{item}': {source}")]
    Batch {
        /// Entity the batch was processing
        entity: String,
        /// Identity of the item whose worker failed first
        item: String,
        /// The worker's failure
        #[source]
        source: Box<Error>,
    },

    /// Asset streaming or video remux failed at a specific stage.
    #[error("asset download failed during {stage} for {url}: {source}")]
    AssetDownload {
        /// Source URL of the asset
        url: String,
        /// Pipeline stage that failed
        stage: AssetStage,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A remote payload did not match the expected typed shape.
    #[error("malformed payload: {source}")]
    Decode {
        /// The decode failure, including the JSON path that diverged
        #[source]
        source: serde_json::Error,
    },

    /// The requested module is not registered
    #[error("unsupported module: {0}")]
    UnsupportedModule(String),

    /// The requested locale is not served by the remote source
    #[error("invalid locale: {0}")]
    InvalidLocale(String),

    /// HTTP transport or status error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (persisted output)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An external tool (yt-dlp, ffmpeg) failed or is unavailable
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// The scrape was cancelled before it completed
    #[error("scrape cancelled")]
    Cancelled,
}

/// Stage discriminator for [`Error::AssetDownload`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetStage {
    /// Streaming the remote resource
    Download,
    /// Writing or finalizing the local file
    Write,
    /// Fetching the video-only elementary stream
    DownloadVideo,
    /// Fetching the audio-only elementary stream
    DownloadAudio,
    /// Remuxing the two streams into one container
    Remux,
}

impl std::fmt::Display for AssetStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetStage::Download => "download",
            AssetStage::Write => "write",
            AssetStage::DownloadVideo => "download-video",
            AssetStage::DownloadAudio => "download-audio",
            AssetStage::Remux => "remux",
        };
        write!(f, "{}", name)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_stage_display_matches_serde_rename() {
        for stage in [
            AssetStage::Download,
            AssetStage::Write,
            AssetStage::DownloadVideo,
            AssetStage::DownloadAudio,
            AssetStage::Remux,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn batch_error_identifies_entity_and_item() {
        let error = Error::Batch {
            entity: "champions".to_string(),
            item: "annie".to_string(),
            source: Box::new(Error::ExternalTool("boom".to_string())),
        };
        let message = error.to_string();
        assert!(message.contains("champions"));
        assert!(message.contains("annie"));
    }

    #[test]
    fn fetch_error_identifies_locator() {
        let decode = serde_json::from_str::<u32>("\"not a number\"").unwrap_err();
        let error = Error::Fetch {
            entity: "index".to_string(),
            locator: "https://example.com/search/index.json".to_string(),
            source: Box::new(Error::Decode { source: decode }),
        };
        assert!(
            error
                .to_string()
                .contains("https://example.com/search/index.json")
        );
    }
}
