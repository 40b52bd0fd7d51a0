//! Per-vendor extraction strategies and their static metadata.
//!
//! Adding a vendor means adding a module with a [`SiteStrategy`] impl and a
//! variant in [`Site`]; nothing in the orchestrator changes.

mod harness;
pub mod plugin_alliance;
pub mod slate_digital;
pub mod solid_state_logic;

use std::time::Duration;

use async_trait::async_trait;
use plugdb_core::RawCandidateRecord;

use crate::error::CrawlerError;
use crate::page::PageDriver;

pub use harness::{ScrapedItem, SelectorSet};

/// How a vendor exposes its full listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// `?page=N` query pages, walked until an empty page.
    Numbered,
    /// One page that grows as it is scrolled.
    InfiniteScroll,
    /// Everything on one static page.
    SinglePage,
}

/// Static facts about a vendor site.
#[derive(Debug)]
pub struct SiteMeta {
    /// Human-readable source label, also persisted as the catalog `source`.
    pub label: &'static str,
    /// Command-line name.
    pub slug: &'static str,
    pub origin: &'static str,
    pub listing_path: &'static str,
    /// Selector matching one product card.
    pub item_selector: &'static str,
    /// Spinner shown while more cards load, if the site has one.
    pub loading_selector: Option<&'static str>,
    pub traversal: Traversal,
    /// Page budget used when the caller does not pass one.
    pub default_max_pages: usize,
}

impl SiteMeta {
    /// Absolute URL of the first listing page.
    #[must_use]
    pub fn listing_url(&self) -> String {
        format!("{}{}", self.origin, self.listing_path)
    }
}

#[async_trait]
pub trait SiteStrategy: Send + Sync {
    fn meta(&self) -> &'static SiteMeta;

    /// Selectors fed to the in-page extraction script.
    fn selectors(&self) -> &'static SelectorSet;

    /// Turns one scraped card into a record. `None` skips the card.
    fn derive(&self, item: ScrapedItem) -> Option<RawCandidateRecord>;

    /// Extracts every record from the page as it currently stands.
    ///
    /// Waits (bounded) for the first card, pauses briefly so lazy content can
    /// render, then lifts every card in one script call. A missing card
    /// selector yields an empty list rather than an error; a card that fails
    /// to parse is skipped on its own.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError`] if the script itself cannot run.
    async fn extract(
        &self,
        page: &dyn PageDriver,
        selector_timeout: Duration,
    ) -> Result<Vec<RawCandidateRecord>, CrawlerError> {
        let meta = self.meta();
        if let Err(e) = page
            .wait_for_selector(meta.item_selector, selector_timeout)
            .await
        {
            if !e.is_timeout() {
                return Err(e);
            }
            tracing::info!(site = meta.label, "no product cards found on page");
        }

        crate::pacing::pause(crate::pacing::DelayWindow::RENDER).await;

        let items = harness::scrape_items(page, self.selectors()).await?;
        let scraped = items.len();
        let records: Vec<RawCandidateRecord> =
            items.into_iter().filter_map(|item| self.derive(item)).collect();

        tracing::debug!(
            site = meta.label,
            scraped,
            kept = records.len(),
            "extracted product cards"
        );
        Ok(records)
    }
}

/// The vendors this crawler knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    PluginAlliance,
    SlateDigital,
    SolidStateLogic,
}

impl Site {
    pub const ALL: [Site; 3] = [
        Site::PluginAlliance,
        Site::SlateDigital,
        Site::SolidStateLogic,
    ];

    #[must_use]
    pub fn strategy(self) -> &'static dyn SiteStrategy {
        match self {
            Site::PluginAlliance => &plugin_alliance::PluginAlliance,
            Site::SlateDigital => &slate_digital::SlateDigital,
            Site::SolidStateLogic => &solid_state_logic::SolidStateLogic,
        }
    }

    #[must_use]
    pub fn meta(self) -> &'static SiteMeta {
        self.strategy().meta()
    }

    /// Looks a site up by its command-line slug.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::UnknownSite`] for unrecognized slugs.
    pub fn from_slug(slug: &str) -> Result<Site, CrawlerError> {
        Site::ALL
            .into_iter()
            .find(|s| s.meta().slug == slug)
            .ok_or_else(|| CrawlerError::UnknownSite(slug.to_string()))
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.meta().label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_site_resolves_by_slug() {
        for site in Site::ALL {
            assert_eq!(Site::from_slug(site.meta().slug).unwrap(), site);
        }
    }

    #[test]
    fn unknown_slug_is_rejected() {
        assert!(matches!(
            Site::from_slug("waves"),
            Err(CrawlerError::UnknownSite(ref s)) if s == "waves"
        ));
    }

    #[test]
    fn traversal_modes_per_site() {
        assert_eq!(Site::PluginAlliance.meta().traversal, Traversal::Numbered);
        assert_eq!(
            Site::SlateDigital.meta().traversal,
            Traversal::InfiniteScroll
        );
        assert_eq!(
            Site::SolidStateLogic.meta().traversal,
            Traversal::SinglePage
        );
    }

    #[test]
    fn listing_urls() {
        assert_eq!(
            Site::PluginAlliance.meta().listing_url(),
            "https://www.plugin-alliance.com/collections/all-products"
        );
        assert_eq!(
            Site::SlateDigital.meta().listing_url(),
            "https://slatedigital.com/plugins"
        );
        assert_eq!(
            Site::SolidStateLogic.meta().listing_url(),
            "https://solidstatelogic.com/products/ssl-plug-ins"
        );
    }

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<&str> = Site::ALL.iter().map(|s| s.meta().label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Site::ALL.len());
    }
}
