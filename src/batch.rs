//! Bounded-concurrency batch execution
//!
//! [`BatchProcessor`] runs a worker over a list of items with at most
//! `limit` invocations in flight at any instant. Slots are refilled as items
//! complete: a worker finishing early immediately pulls the next unclaimed
//! item instead of waiting for the slowest member of a fixed chunk, which is
//! strictly higher throughput when item latencies are heterogeneous.
//!
//! Results are re-associated with their originating items via the index
//! passed to the worker, never via completion order; the returned vector is
//! in input order regardless of which item finished first.
//!
//! Failure policy (fail-fast): the first worker failure stops dispatch of
//! queued items, in-flight siblings are drained and their results discarded,
//! and the batch resolves to [`Error::Batch`] identifying the failing item.
//! Cancelling the token aborts promptly instead: in-flight futures are
//! dropped at their next suspension point and the batch resolves to
//! [`Error::Cancelled`].

use crate::error::{Error, Result};
use crate::types::Event;
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt::Display;
use std::future::Future;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Processes a list of items with bounded concurrency and progress events.
pub struct BatchProcessor {
    entity: String,
    limit: usize,
    events: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl BatchProcessor {
    /// Create a processor for `entity` with at most `limit` concurrent workers.
    ///
    /// A `limit` of zero is clamped to one.
    pub fn new(
        entity: impl Into<String>,
        limit: usize,
        events: broadcast::Sender<Event>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            entity: entity.into(),
            limit: limit.max(1),
            events,
            cancel,
        }
    }

    /// Run `worker` over `items`, returning results in input order.
    ///
    /// The worker receives each item exactly once together with its zero-based
    /// input index. An empty batch resolves immediately with no worker calls.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, worker: F) -> Result<Vec<R>>
    where
        T: Display,
        F: Fn(T, usize) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let total = items.len();
        self.send(Event::BatchStarted {
            entity: self.entity.clone(),
            total,
        });
        if total == 0 {
            self.send(Event::BatchCompleted {
                entity: self.entity.clone(),
                total,
            });
            return Ok(Vec::new());
        }

        let mut queue = items.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        for _ in 0..self.limit {
            if let Some((index, item)) = queue.next() {
                in_flight.push(Self::run_one(&worker, index, item));
            }
        }

        let mut slots: Vec<Option<R>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);
        let mut completed = 0usize;
        let mut failure: Option<Error> = None;

        while !in_flight.is_empty() {
            let (index, label, outcome) = tokio::select! {
                _ = self.cancel.cancelled() => {
                    // Dropping in_flight aborts the workers at their next
                    // suspension point.
                    return Err(Error::Cancelled);
                }
                Some(done) = in_flight.next() => done,
            };
            match outcome {
                Ok(result) => {
                    slots[index] = Some(result);
                    completed += 1;
                    self.send(Event::BatchItemCompleted {
                        entity: self.entity.clone(),
                        completed,
                        total,
                        item: label,
                    });
                    if failure.is_none() {
                        if let Some((next_index, next_item)) = queue.next() {
                            in_flight.push(Self::run_one(&worker, next_index, next_item));
                        }
                    }
                }
                Err(source) => {
                    tracing::warn!(
                        entity = %self.entity,
                        item = %label,
                        error = %source,
                        "batch item failed"
                    );
                    if failure.is_none() {
                        failure = Some(Error::Batch {
                            entity: self.entity.clone(),
                            item: label,
                            source: Box::new(source),
                        });
                    }
                }
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }

        self.send(Event::BatchCompleted {
            entity: self.entity.clone(),
            total,
        });
        let results: Vec<R> = slots.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), total);
        Ok(results)
    }

    async fn run_one<T, R, F, Fut>(worker: &F, index: usize, item: T) -> (usize, String, Result<R>)
    where
        T: Display,
        F: Fn(T, usize) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let label = item.to_string();
        let outcome = worker(item, index).await;
        (index, label, outcome)
    }

    fn send(&self, event: Event) {
        // Nobody listening is fine; rendering is optional.
        let _ = self.events.send(event);
    }
}
