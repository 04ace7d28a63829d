//! Core types and events for universe-dl

use serde::{Deserialize, Serialize};

/// Pipeline phase of a scrape run
///
/// Phases are strictly sequential: each phase's output is the next phase's
/// required input. `Failed` is terminal and reachable from any non-terminal
/// phase; on failure no partial output file is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// No scrape in progress
    Idle,
    /// Retrieving the search index
    FetchingIndex,
    /// Retrieving entity payloads in batches
    FetchingEntities,
    /// Deriving asset URL sets from entity payloads
    DerivingAssetUrls,
    /// Downloading assets in batches
    DownloadingAssets,
    /// Writing the aggregated dataset
    PersistingResult,
    /// Run completed successfully
    Done,
    /// Run aborted with an error
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::FetchingIndex => "fetching-index",
            Phase::FetchingEntities => "fetching-entities",
            Phase::DerivingAssetUrls => "deriving-asset-urls",
            Phase::DownloadingAssets => "downloading-assets",
            Phase::PersistingResult => "persisting-result",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Summary of a completed scrape run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeReport {
    /// Number of faction payloads retrieved
    pub factions: usize,
    /// Number of champion payloads retrieved
    pub champions: usize,
    /// Number of story payloads retrieved
    pub stories: usize,
    /// Number of unique assets materialized
    pub assets: usize,
}

/// Events emitted on the broadcast channel
///
/// Consumers subscribe via [`crate::Scraper::subscribe`]; the library holds
/// no rendering logic. Dropped receivers and lagging subscribers never block
/// the pipeline.
#[derive(Clone, Debug, Serialize)]
pub enum Event {
    /// A scrape run started
    ScrapeStarted {
        /// Module being scraped
        module: String,
    },

    /// The run moved to a new pipeline phase
    PhaseChanged {
        /// Module being scraped
        module: String,
        /// Phase just entered
        phase: Phase,
    },

    /// A batch began processing
    BatchStarted {
        /// Entity the batch processes (e.g., "champions", "faction assets")
        entity: String,
        /// Number of items submitted
        total: usize,
    },

    /// One batch item completed
    BatchItemCompleted {
        /// Entity the batch processes
        entity: String,
        /// Items completed so far, including this one
        completed: usize,
        /// Number of items submitted
        total: usize,
        /// Identity of the item that just completed
        item: String,
    },

    /// A batch finished with every item completed
    BatchCompleted {
        /// Entity the batch processed
        entity: String,
        /// Number of items processed
        total: usize,
    },

    /// A scrape run completed successfully
    ScrapeCompleted {
        /// Module that was scraped
        module: String,
        /// Run summary
        report: ScrapeReport,
    },

    /// A scrape run aborted
    ScrapeFailed {
        /// Module that was being scraped
        module: String,
        /// Rendered error
        error: String,
    },
}
