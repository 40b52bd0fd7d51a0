//! Plugin Alliance: a Shopify storefront with numbered collection pages.
//!
//! Cards carry the vendor caption, so this is the only site where the
//! developer varies per record. Sale cards show the sale price and the struck
//! list price side by side.

use plugdb_core::{RawCandidateRecord, DEFAULT_CURRENCY};

use super::{ScrapedItem, SelectorSet, SiteMeta, SiteStrategy, Traversal};
use crate::normalize::{absolutize_url, collapse_whitespace, non_blank, parse_positive_price};

pub struct PluginAlliance;

static META: SiteMeta = SiteMeta {
    label: "Plugin Alliance",
    slug: "plugin-alliance",
    origin: "https://www.plugin-alliance.com",
    listing_path: "/collections/all-products",
    item_selector: "li.grid__item, .card-wrapper.product-card-wrapper",
    loading_selector: None,
    traversal: Traversal::Numbered,
    default_max_pages: 10,
};

static SELECTORS: SelectorSet = SelectorSet {
    item: "li.grid__item, .card-wrapper.product-card-wrapper",
    title: ".card__heading a, .card__heading h3 a",
    title_link: Some(".card__heading a, .card__heading h3 a"),
    vendor: Some(".caption-with-letter-spacing.light"),
    description: Some(
        ".short-description.metafield .metafield-rich_text_field p, .short-description p",
    ),
    price_scope: Some(".price__container"),
    price_sale: Some(".price-item--sale.price-item--last"),
    price_regular: Some(".price-item--regular"),
    image: Some("img"),
    image_attrs: &["src"],
    image_from_background: false,
    links: &[
        ".card__heading a",
        "a.full-unstyled-link[href*=\"/products/\"]",
    ],
};

impl SiteStrategy for PluginAlliance {
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

        let sale = item.price_sale.as_deref().and_then(parse_positive_price);
        let regular = item.price_regular.as_deref().and_then(parse_positive_price);
        let (price, original_price) = match sale {
            Some(sale) => (Some(sale), regular),
            None => (regular, None),
        };

        let source_url = item
            .title_link
            .or(item.link)
            .and_then(|href| absolutize_url(META.origin, &href));
        let image_url = item
            .image
            .and_then(|src| absolutize_url(META.origin, &src));

        Some(RawCandidateRecord {
            name,
            developer: non_blank(item.vendor.as_deref()),
            description: non_blank(item.description.as_deref()),
            price,
            original_price,
            currency: Some(DEFAULT_CURRENCY.to_string()),
            image_url,
            source_url,
        })
    }
}
