//! Command-line interface for universe-dl.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::broadcast;
use universe_dl::{Config, Event, Scraper, modules};

#[derive(Parser)]
#[command(
    name = "universe-dl",
    version,
    about = "Scrapes structured content universes and their media assets"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a module (or `all`) into the local data directory
    Scrape {
        /// Module to scrape
        module: String,

        /// Locale to scrape
        #[arg(long, default_value = "en_us")]
        locale: String,

        /// Data directory for the persisted dataset and assets
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Maximum concurrent asset downloads
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// List registered modules and supported locales
    Modules,
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(error) = run(Cli::parse()).await {
        eprintln!("universe-dl error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("universe_dl=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> universe_dl::Result<()> {
    match cli.command {
        Command::Modules => {
            println!("modules:");
            for name in modules::MODULE_NAMES {
                println!("  - {name}");
            }
            println!("locales:");
            for locale in modules::SUPPORTED_LOCALES {
                println!("  - {locale}");
            }
            Ok(())
        }
        Command::Scrape {
            module,
            locale,
            data_dir,
            concurrency,
        } => {
            let mut config = Config::default();
            config.source.locale = locale;
            config.download.data_dir = data_dir;
            if let Some(limit) = concurrency {
                config.download.max_concurrent_downloads = limit;
            }
            let scraper = Scraper::new(config)?;

            let cancel = scraper.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, cancelling scrape");
                    cancel.cancel();
                }
            });

            let progress = tokio::spawn(render_progress(scraper.subscribe()));

            let selected: Vec<String> = if module == "all" {
                modules::MODULE_NAMES.iter().map(|s| s.to_string()).collect()
            } else {
                vec![module]
            };
            for name in &selected {
                tracing::info!(module = %name, "starting scrape");
                let report = scraper.scrape(name).await?;
                println!(
                    "scraped {name}: {} factions, {} champions, {} stories, {} assets",
                    report.factions, report.champions, report.stories, report.assets
                );
            }

            drop(scraper);
            let _ = progress.await;
            Ok(())
        }
    }
}

/// Render batch progress bars off the event channel.
///
/// Runs until every event sender is dropped; rendering failures never affect
/// the scrape itself.
async fn render_progress(mut events: broadcast::Receiver<Event>) {
    let mut bars: HashMap<String, ProgressBar> = HashMap::new();
    loop {
        match events.recv().await {
            Ok(Event::BatchStarted { entity, total }) => {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{msg:>18} {bar:40.cyan/blue} {pos}/{len} {per_sec}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar.set_message(entity.clone());
                bars.insert(entity, bar);
            }
            Ok(Event::BatchItemCompleted { entity, item, .. }) => {
                if let Some(bar) = bars.get(&entity) {
                    bar.inc(1);
                    bar.set_message(item);
                }
            }
            Ok(Event::BatchCompleted { entity, .. }) => {
                if let Some(bar) = bars.remove(&entity) {
                    bar.finish_and_clear();
                }
            }
            Ok(Event::PhaseChanged { phase, .. }) => {
                tracing::info!(%phase, "phase");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress renderer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
