//! Utility functions for file operations and URL handling

use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub(crate) const TEMP_SUFFIX: &str = ".part";

/// Sibling temp path for `path` (`<path>.part`).
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(TEMP_SUFFIX);
    PathBuf::from(os)
}

/// Serialize `value` as pretty-printed JSON and write it atomically.
///
/// The document is written to a `.part` sibling and renamed into place, so
/// the destination never holds a partially-written file. Parent directories
/// are created as needed.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Lowercased extension of a URL's trailing path segment, if any.
///
/// Query and fragment are not part of the path and never leak into the
/// extension.
pub fn url_extension(url: &url::Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}
