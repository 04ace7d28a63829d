//! Scraper modules and the module registry
//!
//! Each data source is a [`ScraperModule`]; shared machinery (the batch
//! executor, fetch operations, the asset store) is composed into modules,
//! never inherited. The registry maps invocation-surface names to concrete
//! modules.

pub mod universe;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Event, ScrapeReport};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Locales the remote source serves.
pub const SUPPORTED_LOCALES: &[&str] = &[
    "cs_cz", "de_de", "el_gr", "en_au", "en_gb", "en_us", "es_es", "es_mx", "fr_fr", "hu_hu",
    "id_id", "it_it", "ja_jp", "ko_kr", "pl_pl", "pt_br", "ro_ro", "ru_ru", "th_th", "tr_tr",
    "vi_vn", "zh_tw",
];

/// Names of all registered modules.
pub const MODULE_NAMES: &[&str] = &[universe::NAME];

/// Validate a locale against [`SUPPORTED_LOCALES`].
pub fn validate_locale(locale: &str) -> Result<()> {
    if SUPPORTED_LOCALES.contains(&locale) {
        Ok(())
    } else {
        Err(Error::InvalidLocale(locale.to_string()))
    }
}

/// One scrapable data source.
#[async_trait]
pub trait ScraperModule: Send + Sync {
    /// Module name as used by the invocation surface.
    fn name(&self) -> &'static str;

    /// Run the full pipeline: fetch, download assets, persist.
    async fn scrape(&self) -> Result<ScrapeReport>;
}

/// Instantiate the module registered under `name`.
pub fn create_module(
    name: &str,
    config: &Config,
    events: broadcast::Sender<Event>,
    cancel: CancellationToken,
) -> Result<Box<dyn ScraperModule>> {
    match name {
        universe::NAME => Ok(Box::new(universe::UniverseModule::new(
            config, events, cancel,
        )?)),
        other => Err(Error::UnsupportedModule(other.to_string())),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_module_is_rejected() {
        let (events, _) = broadcast::channel(16);
        let error = create_module(
            "galaxies",
            &Config::default(),
            events,
            CancellationToken::new(),
        )
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(error, Error::UnsupportedModule(name) if name == "galaxies"));
    }

    #[test]
    fn every_registered_module_resolves() {
        for name in MODULE_NAMES {
            let (events, _) = broadcast::channel(16);
            let module =
                create_module(name, &Config::default(), events, CancellationToken::new()).unwrap();
            assert_eq!(module.name(), *name);
        }
    }

    #[test]
    fn locale_validation_matches_supported_list() {
        validate_locale("en_us").unwrap();
        validate_locale("pt_br").unwrap();
        assert!(matches!(
            validate_locale("xx_yy").unwrap_err(),
            Error::InvalidLocale(locale) if locale == "xx_yy"
        ));
    }
}
