//! Scraper module for the universe content source
//!
//! The pipeline is strictly sequential because each phase's output is the
//! next phase's required input: entity slugs come from the index, asset URLs
//! come from entity payload fields, and the persisted aggregate collects all
//! entity payloads. A failure in any phase aborts the whole run without
//! writing the output document; re-running from the start is the caller's
//! decision.

pub mod model;

use crate::assets::AssetStore;
use crate::assets::video::{self, VideoHandler};
use crate::batch::BatchProcessor;
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{FetchOperation, Locator, fetch_batch};
use crate::modules::{ScraperModule, validate_locale};
use crate::types::{Event, Phase, ScrapeReport};
use crate::utils;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use self::model::{ChampionPage, FactionPage, SearchIndex, StoryPage};

/// Module name as used by the invocation surface.
pub const NAME: &str = "universe";

/// Aggregate persisted at the end of a successful run.
#[derive(Serialize)]
struct RawDataset<'a> {
    factions: Vec<&'a FactionPage>,
    champions: Vec<&'a ChampionPage>,
    stories: Vec<&'a StoryPage>,
}

/// Scrapes the universe content source.
pub struct UniverseModule {
    events: broadcast::Sender<Event>,
    cancel: CancellationToken,
    fetch_limit: usize,
    download_limit: usize,
    output_path: PathBuf,
    index_op: FetchOperation<SearchIndex>,
    faction_op: FetchOperation<FactionPage>,
    champion_op: FetchOperation<ChampionPage>,
    story_op: FetchOperation<StoryPage>,
    assets: AssetStore,
}

impl UniverseModule {
    /// Create the module, resolving the video handler from configuration.
    pub fn new(
        config: &Config,
        events: broadcast::Sender<Event>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let handler = video::resolve_handler(&config.tools);
        Self::with_video_handler(config, events, cancel, handler)
    }

    /// Create the module with an explicit video handler.
    pub fn with_video_handler(
        config: &Config,
        events: broadcast::Sender<Event>,
        cancel: CancellationToken,
        handler: Arc<dyn VideoHandler>,
    ) -> Result<Self> {
        validate_locale(&config.source.locale)?;
        let client = reqwest::Client::builder()
            .timeout(config.download.request_timeout)
            .build()?;

        let base = format!(
            "{}/{}",
            config.source.base_url.trim_end_matches('/'),
            config.source.locale
        );
        let index_op = FetchOperation::new(
            "index",
            client.clone(),
            Locator::Constant(format!("{base}/search/index.json")),
        );
        let faction_op = FetchOperation::new("factions", client.clone(), {
            let base = base.clone();
            Locator::Keyed(Box::new(move |slug| {
                format!("{base}/factions/{slug}/index.json")
            }))
        });
        let champion_op = FetchOperation::new("champions", client.clone(), {
            let base = base.clone();
            Locator::Keyed(Box::new(move |slug| {
                format!("{base}/champions/{slug}/index.json")
            }))
        });
        let story_op = FetchOperation::new("stories", client.clone(), {
            let base = base.clone();
            Locator::Keyed(Box::new(move |slug| format!("{base}/story/{slug}/index.json")))
        });

        let assets = AssetStore::new(client, config.download.asset_dir(), handler);

        Ok(Self {
            events,
            cancel,
            fetch_limit: config.download.max_concurrent_fetches,
            download_limit: config.download.max_concurrent_downloads,
            output_path: config.download.output_path(),
            index_op,
            faction_op,
            champion_op,
            story_op,
            assets,
        })
    }

    fn enter_phase(&self, phase: Phase) {
        tracing::info!(module = NAME, %phase, "entering phase");
        let _ = self.events.send(Event::PhaseChanged {
            module: NAME.to_string(),
            phase,
        });
    }

    async fn run_pipeline(&self) -> Result<ScrapeReport> {
        self.enter_phase(Phase::FetchingIndex);
        let index = self.index_op.fetch(None).await?;

        self.enter_phase(Phase::FetchingEntities);
        let faction_slugs: Vec<String> =
            index.factions.iter().map(|s| s.slug.clone()).collect();
        let champion_slugs: Vec<String> =
            index.champions.iter().map(|s| s.slug.clone()).collect();
        let factions = fetch_batch(
            &self.faction_op,
            &faction_slugs,
            self.fetch_limit,
            &self.events,
            &self.cancel,
        )
        .await?;
        let champions = fetch_batch(
            &self.champion_op,
            &champion_slugs,
            self.fetch_limit,
            &self.events,
            &self.cancel,
        )
        .await?;
        let story_slugs = Self::story_slugs(&factions, &champions);
        let stories = fetch_batch(
            &self.story_op,
            &story_slugs,
            self.fetch_limit,
            &self.events,
            &self.cancel,
        )
        .await?;

        self.enter_phase(Phase::DerivingAssetUrls);
        let faction_urls = Self::faction_asset_urls(&factions);
        let champion_urls = Self::champion_asset_urls(&champions);
        let story_urls = Self::story_asset_urls(&stories);

        self.enter_phase(Phase::DownloadingAssets);
        self.download_assets("faction assets", faction_urls).await?;
        self.download_assets("champion assets", champion_urls).await?;
        self.download_assets("story assets", story_urls).await?;

        self.enter_phase(Phase::PersistingResult);
        let dataset = RawDataset {
            factions: factions.iter().map(|page| &**page).collect(),
            champions: champions.iter().map(|page| &**page).collect(),
            stories: stories.iter().map(|page| &**page).collect(),
        };
        utils::write_json_atomic(&self.output_path, &dataset).await?;

        let report = ScrapeReport {
            factions: factions.len(),
            champions: champions.len(),
            stories: stories.len(),
            assets: self.assets.recorded().await,
        };
        self.enter_phase(Phase::Done);
        Ok(report)
    }

    /// Story slugs referenced by story-preview modules, first-seen order,
    /// de-duplicated. Factions come before champions, matching the order
    /// their payloads are fetched in.
    fn story_slugs(factions: &[Arc<FactionPage>], champions: &[Arc<ChampionPage>]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut slugs = Vec::new();
        let modules = factions
            .iter()
            .flat_map(|page| page.modules.iter())
            .chain(champions.iter().flat_map(|page| page.modules.iter()));
        for module in modules {
            if let Some(slug) = module.story_slug() {
                if seen.insert(slug.to_string()) {
                    slugs.push(slug.to_string());
                }
            }
        }
        slugs
    }

    fn faction_asset_urls(factions: &[Arc<FactionPage>]) -> Vec<String> {
        let mut urls = Vec::new();
        for page in factions {
            urls.push(page.faction.image.uri.clone());
            urls.push(page.faction.video.uri.clone());
            for module in &page.modules {
                urls.extend(module.asset_links().iter().map(|s| s.to_string()));
            }
        }
        urls
    }

    fn champion_asset_urls(champions: &[Arc<ChampionPage>]) -> Vec<String> {
        let mut urls = Vec::new();
        for page in champions {
            urls.push(page.champion.image.uri.clone());
            if let Some(video) = &page.champion.video {
                urls.push(video.uri.clone());
            }
            for module in &page.modules {
                urls.extend(module.asset_links().iter().map(|s| s.to_string()));
            }
        }
        urls
    }

    fn story_asset_urls(stories: &[Arc<StoryPage>]) -> Vec<String> {
        let mut urls = Vec::new();
        for page in stories {
            for section in &page.story.story_sections {
                if let Some(background) = &section.background_image {
                    urls.push(background.uri.clone());
                }
                for subsection in &section.story_subsections {
                    if let Some(icon) = &subsection.icon_image {
                        urls.push(icon.uri.clone());
                    }
                }
            }
        }
        urls
    }

    async fn download_assets(&self, entity: &str, urls: Vec<String>) -> Result<()> {
        let processor = BatchProcessor::new(
            entity,
            self.download_limit,
            self.events.clone(),
            self.cancel.clone(),
        );
        // The store's record map de-duplicates repeated URLs across batches.
        processor
            .run(urls, |url, _index| async move {
                self.assets.download(&url).await
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ScraperModule for UniverseModule {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn scrape(&self) -> Result<ScrapeReport> {
        let _ = self.events.send(Event::ScrapeStarted {
            module: NAME.to_string(),
        });
        match self.run_pipeline().await {
            Ok(report) => {
                let _ = self.events.send(Event::ScrapeCompleted {
                    module: NAME.to_string(),
                    report: report.clone(),
                });
                Ok(report)
            }
            Err(error) => {
                self.enter_phase(Phase::Failed);
                let _ = self.events.send(Event::ScrapeFailed {
                    module: NAME.to_string(),
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }
}
