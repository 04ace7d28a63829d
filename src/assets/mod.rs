//! Asset downloading and de-duplication
//!
//! An [`AssetStore`] routes each URL to either a direct stream-to-file
//! download or the video extraction path, names every file by a
//! content-derived identifier (a stable hash of the URL string, so re-runs
//! map to the same file names), and guarantees a given URL is downloaded at
//! most once per run. The URL → identifier map is appended to only after a
//! download fully succeeds; a failed attempt leaves no entry and no
//! partially-written file considered valid.

pub mod video;

use crate::error::{AssetStage, Error, Result};
use crate::utils;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use self::video::{StreamSelector, VideoHandler};

/// How a URL is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    /// Direct stream-to-file download
    Standard,
    /// Two-stream fetch plus remux
    Video,
}

/// Hosts whose URLs are routed to the video extraction path.
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be"];

/// Downloads assets into a directory, de-duplicating by URL within one run.
pub struct AssetStore {
    client: reqwest::Client,
    asset_dir: PathBuf,
    video: Arc<dyn VideoHandler>,
    seen: Mutex<HashMap<String, String>>,
}

impl AssetStore {
    /// Create a store writing into `asset_dir`.
    pub fn new(client: reqwest::Client, asset_dir: PathBuf, video: Arc<dyn VideoHandler>) -> Self {
        Self {
            client,
            asset_dir,
            video,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Content identifier for `url`: lowercase hex SHA-256 of the URL string.
    ///
    /// Stable across runs, so repeated scrapes resolve to the same file name.
    pub fn content_id(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    /// Classify `url` by host.
    ///
    /// Unparseable URLs fall through to the standard path where the request
    /// itself will produce the real error.
    pub fn classify(url: &str) -> AssetKind {
        let Ok(parsed) = url::Url::parse(url) else {
            return AssetKind::Standard;
        };
        let Some(host) = parsed.host_str() else {
            return AssetKind::Standard;
        };
        let host = host.to_ascii_lowercase();
        let is_video = VIDEO_HOSTS
            .iter()
            .any(|candidate| host == *candidate || host.ends_with(&format!(".{candidate}")));
        if is_video {
            AssetKind::Video
        } else {
            AssetKind::Standard
        }
    }

    /// Number of assets recorded so far.
    pub async fn recorded(&self) -> usize {
        self.seen.lock().await.len()
    }

    /// Download `url` into the asset directory.
    ///
    /// Idempotent per run: a URL already recorded is a no-op with no network
    /// access. The URL is recorded only after the download fully succeeds.
    pub async fn download(&self, url: &str) -> Result<()> {
        if self.seen.lock().await.contains_key(url) {
            tracing::debug!(url, "asset already downloaded, skipping");
            return Ok(());
        }

        let id = Self::content_id(url);
        tokio::fs::create_dir_all(&self.asset_dir).await?;
        match Self::classify(url) {
            AssetKind::Standard => self.download_standard(url, &id).await?,
            AssetKind::Video => self.download_video(url, &id).await?,
        }

        self.seen.lock().await.insert(url.to_string(), id);
        Ok(())
    }

    async fn download_standard(&self, url: &str, id: &str) -> Result<()> {
        let ext = url::Url::parse(url)
            .ok()
            .as_ref()
            .and_then(utils::url_extension)
            .unwrap_or_else(|| "bin".to_string());
        let dest = self.asset_dir.join(format!("{id}.{ext}"));
        let tmp = utils::temp_path(&dest);

        if let Err(error) = self.stream_to_file(url, &tmp).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(error);
        }
        tokio::fs::rename(&tmp, &dest)
            .await
            .map_err(|e| asset_error(url, AssetStage::Write, Error::Io(e)))?;
        tracing::debug!(url, dest = %dest.display(), "asset downloaded");
        Ok(())
    }

    async fn stream_to_file(&self, url: &str, tmp: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| asset_error(url, AssetStage::Download, Error::Network(e)))?;

        let mut file = tokio::fs::File::create(tmp)
            .await
            .map_err(|e| asset_error(url, AssetStage::Write, Error::Io(e)))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| asset_error(url, AssetStage::Download, Error::Network(e)))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| asset_error(url, AssetStage::Write, Error::Io(e)))?;
        }
        file.flush()
            .await
            .map_err(|e| asset_error(url, AssetStage::Write, Error::Io(e)))?;
        Ok(())
    }

    async fn download_video(&self, url: &str, id: &str) -> Result<()> {
        let dest = self.asset_dir.join(format!("{id}.webm"));
        let video_tmp = self.asset_dir.join(format!("{id}.video.webm"));
        let audio_tmp = self.asset_dir.join(format!("{id}.audio.webm"));

        let outcome = self.fetch_and_remux(url, &video_tmp, &audio_tmp, &dest).await;
        // Elementary-stream temps are removed on success and failure alike.
        let _ = tokio::fs::remove_file(&video_tmp).await;
        let _ = tokio::fs::remove_file(&audio_tmp).await;
        if outcome.is_ok() {
            tracing::debug!(url, dest = %dest.display(), handler = self.video.name(), "video downloaded");
        }
        outcome
    }

    async fn fetch_and_remux(
        &self,
        url: &str,
        video_tmp: &Path,
        audio_tmp: &Path,
        dest: &Path,
    ) -> Result<()> {
        self.video
            .fetch_stream(url, StreamSelector::VideoOnly, video_tmp)
            .await
            .map_err(|e| asset_error(url, AssetStage::DownloadVideo, e))?;
        self.video
            .fetch_stream(url, StreamSelector::AudioOnly, audio_tmp)
            .await
            .map_err(|e| asset_error(url, AssetStage::DownloadAudio, e))?;

        let tmp = utils::temp_path(dest);
        if let Err(error) = self.video.remux(video_tmp, audio_tmp, &tmp).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(asset_error(url, AssetStage::Remux, error));
        }
        tokio::fs::rename(&tmp, dest)
            .await
            .map_err(|e| asset_error(url, AssetStage::Write, Error::Io(e)))
    }
}

fn asset_error(url: &str, stage: AssetStage, source: Error) -> Error {
    Error::AssetDownload {
        url: url.to_string(),
        stage,
        source: Box::new(source),
    }
}
