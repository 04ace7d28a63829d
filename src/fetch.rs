//! Memoizing fetch operations for JSON endpoints
//!
//! A [`FetchOperation`] wraps one logical retrieval (an entity type and the
//! locator its keys resolve to) with an in-memory cache keyed by resolved
//! locator, guaranteeing at most one network round trip per locator for the
//! lifetime of the operation. Payloads are decoded into typed records at
//! this boundary; an unexpected shape is a typed decode error, never a
//! silently-missing field.
//!
//! Failures are not cached, so a subsequent call retries. Two workers
//! racing on the same locator may both miss the cache and issue duplicate
//! in-flight requests; that narrow race is accepted as a non-fatal
//! inefficiency rather than building per-locator request coalescing.

use crate::batch::BatchProcessor;
use crate::error::{Error, Result};
use crate::types::Event;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

/// Resolves a fetch key to the URL a request is issued against.
pub enum Locator {
    /// A fixed URL, independent of any key
    Constant(String),
    /// A URL derived from a key
    Keyed(Box<dyn Fn(&str) -> String + Send + Sync>),
}

impl Locator {
    fn resolve(&self, entity: &str, key: Option<&str>) -> Result<String> {
        match self {
            Locator::Constant(url) => Ok(url.clone()),
            Locator::Keyed(template) => key.map(|k| template(k)).ok_or_else(|| Error::Config {
                message: format!("fetch operation '{entity}' requires a key"),
                key: None,
            }),
        }
    }
}

/// A memoizing fetch operation for one entity type.
pub struct FetchOperation<T> {
    entity: String,
    client: reqwest::Client,
    locator: Locator,
    cache: Mutex<HashMap<String, Arc<T>>>,
}

impl<T: DeserializeOwned> FetchOperation<T> {
    /// Create a fetch operation for `entity` issuing requests via `client`.
    pub fn new(entity: impl Into<String>, client: reqwest::Client, locator: Locator) -> Self {
        Self {
            entity: entity.into(),
            client,
            locator,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Entity this operation retrieves, for reporting.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Fetch the payload for `key` (or the constant locator when `None`).
    ///
    /// A cache hit returns immediately with no network access.
    pub async fn fetch(&self, key: Option<&str>) -> Result<Arc<T>> {
        let locator = self.locator.resolve(&self.entity, key)?;

        if let Some(hit) = self.cache.lock().await.get(&locator) {
            tracing::trace!(entity = %self.entity, %locator, "fetch cache hit");
            return Ok(Arc::clone(hit));
        }

        let payload = self.retrieve(&locator).await.map_err(|source| Error::Fetch {
            entity: self.entity.clone(),
            locator: locator.clone(),
            source: Box::new(source),
        })?;
        let payload = Arc::new(payload);
        self.cache
            .lock()
            .await
            .insert(locator, Arc::clone(&payload));
        Ok(payload)
    }

    async fn retrieve(&self, locator: &str) -> Result<T> {
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .and_then(|response| response.error_for_status())?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| Error::Decode { source })
    }
}

/// Fetch a batch of keys through `op` with bounded concurrency.
///
/// Results come back in key order; a failing key aborts the batch with
/// [`Error::Batch`] tagged with the operation's entity.
pub async fn fetch_batch<T: DeserializeOwned>(
    op: &FetchOperation<T>,
    keys: &[String],
    limit: usize,
    events: &broadcast::Sender<Event>,
    cancel: &CancellationToken,
) -> Result<Vec<Arc<T>>> {
    let processor = BatchProcessor::new(op.entity(), limit, events.clone(), cancel.clone());
    processor
        .run(keys.to_vec(), |key, _index| async move {
            op.fetch(Some(&key)).await
        })
        .await
}
