//! Solid State Logic: one static page of plugin tiles. Each tile is itself the
//! product link and its artwork is a CSS background image.

use plugdb_core::{RawCandidateRecord, DEFAULT_CURRENCY};

use super::{ScrapedItem, SelectorSet, SiteMeta, SiteStrategy, Traversal};
use crate::normalize::{absolutize_url, collapse_whitespace, css_background_url, non_blank};

pub struct SolidStateLogic;

const DEVELOPER: &str = "Solid State Logic";

static META: SiteMeta = SiteMeta {
    label: "Solid State Logic",
    slug: "solid-state-logic",
    origin: "https://solidstatelogic.com",
    listing_path: "/products/ssl-plug-ins",
    item_selector: "a.cb-image-content-highlight",
    loading_selector: None,
    traversal: Traversal::SinglePage,
    default_max_pages: 1,
};

static SELECTORS: SelectorSet = SelectorSet {
    item: "a.cb-image-content-highlight",
    title: "div.content div.h3.color-alpha",
    title_link: None,
    vendor: None,
    description: Some("div.content p.color-beta"),
    price_scope: None,
    price_sale: None,
    price_regular: None,
    image: Some("div.top div.image"),
    image_attrs: &[],
    image_from_background: true,
    links: &[":scope"],
};

impl SiteStrategy for SolidStateLogic {
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

        let image_url = item
            .image
            .as_deref()
            .and_then(css_background_url)
            .and_then(|src| absolutize_url(META.origin, &src));
        let source_url = item
            .link
            .and_then(|href| absolutize_url(META.origin, &href));

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
