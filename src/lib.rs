//! # universe-dl
//!
//! Scraper for structured content universes and their media assets.
//!
//! ## Design Philosophy
//!
//! universe-dl is designed to be:
//! - **Library-first** - The CLI binary is a thin consumer of one entry point
//! - **Event-driven** - Consumers subscribe to progress events, no polling
//! - **All-or-nothing** - A failed run persists nothing; re-running is cheap
//!   because content identifiers are stable across runs
//!
//! ## Quick Start
//!
//! ```no_run
//! use universe_dl::{Config, Scraper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scraper = Scraper::new(Config::default())?;
//!
//!     // Subscribe to progress events
//!     let mut events = scraper.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = scraper.scrape("universe").await?;
//!     println!("{:?}", report);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Asset downloading and de-duplication
pub mod assets;
/// Bounded-concurrency batch execution
pub mod batch;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Memoizing fetch operations
pub mod fetch;
/// Scraper modules and the module registry
pub mod modules;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, SourceConfig, ToolsConfig};
pub use error::{AssetStage, Error, Result};
pub use types::{Event, Phase, ScrapeReport};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Entry point owning the configuration, event channel, and cancellation.
///
/// State (fetch caches, the asset record map) lives inside the module a
/// [`Scraper::scrape`] call constructs, so every invocation starts from a
/// clean slate and runs are isolated from each other.
pub struct Scraper {
    config: Config,
    events: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl Scraper {
    /// Create a scraper after validating `config`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config,
            events,
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Token cancelling any in-flight scrape when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The validated configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline for the module registered under `name`.
    pub async fn scrape(&self, name: &str) -> Result<ScrapeReport> {
        let module =
            modules::create_module(name, &self.config, self.events.clone(), self.cancel.clone())?;
        module.scrape().await
    }
}
