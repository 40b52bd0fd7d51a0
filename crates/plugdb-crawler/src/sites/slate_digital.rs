//! Slate Digital: a single plugin page that loads more cards as it scrolls.
//! Plugins are sold by subscription, so cards carry no price.

use plugdb_core::{RawCandidateRecord, DEFAULT_CURRENCY};

use super::{ScrapedItem, SelectorSet, SiteMeta, SiteStrategy, Traversal};
use crate::normalize::{absolutize_url, collapse_whitespace, non_blank};

pub struct SlateDigital;

const DEVELOPER: &str = "Slate Digital";

static META: SiteMeta = SiteMeta {
    label: "Slate Digital",
    slug: "slate-digital",
    origin: "https://slatedigital.com",
    listing_path: "/plugins",
    item_selector: ".plugin-item.plugin-item-boxed-2",
    loading_selector: Some(".loading, [class*=\"loading\"], [class*=\"spinner\"]"),
    traversal: Traversal::InfiniteScroll,
    default_max_pages: 1,
};

static SELECTORS: SelectorSet = SelectorSet {
    item: ".plugin-item.plugin-item-boxed-2",
    title: "h3.plugin-item-title",
    title_link: Some("h3.plugin-item-title a"),
    vendor: None,
    description: Some("p.plugin-item-description"),
    price_scope: None,
    price_sale: None,
    price_regular: None,
    image: Some(".plugin-item-img img"),
    image_attrs: &["src", "data-src"],
    image_from_background: false,
    links: &[".plugin-item-box2 > a, .plugin-item-img"],
};

impl SiteStrategy for SlateDigital {
    fn meta(&self) -> &'static SiteMeta {
        &META
    }

    fn selectors(&self) -> &'static SelectorSet {
        &SELECTORS
    }

    fn derive(&self, item: ScrapedItem) -> Option<RawCandidateRecord> {
        let name = collapse_whitespace(item.title.as_deref()?);
        if name.is_empty() {
            return None;
        }

        // the image anchor points at the canonical product page; the title
        // link is only a fallback
        let source_url = item
            .link
            .or(item.image_link)
            .or(item.title_link)
            .and_then(|href| absolutize_url(META.origin, &href));
        let image_url = item
            .image
            .and_then(|src| absolutize_url(META.origin, &src));

        Some(RawCandidateRecord {
            name,
            developer: Some(DEVELOPER.to_string()),
            description: non_blank(item.description.as_deref()),
            price: None,
            original_price: None,
            currency: Some(DEFAULT_CURRENCY.to_string()),
            image_url,
            source_url,
        })
    }
}
