//! The single in-page script every strategy runs.
//!
//! The script only lifts raw strings out of each product card; all
//! interpretation (prices, URL resolution, defaults) happens in Rust so it can
//! be unit tested without a browser.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CrawlerError;
use crate::page::PageDriver;

/// Selectors describing where each field lives inside a product card.
///
/// Comma-separated selector lists are allowed anywhere a single selector is.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSet {
    pub item: &'static str,
    pub title: &'static str,
    pub title_link: Option<&'static str>,
    pub vendor: Option<&'static str>,
    pub description: Option<&'static str>,
    /// When set, price selectors are resolved inside this element only.
    pub price_scope: Option<&'static str>,
    pub price_sale: Option<&'static str>,
    pub price_regular: Option<&'static str>,
    pub image: Option<&'static str>,
    /// Attributes tried in order for the image URL.
    pub image_attrs: &'static [&'static str],
    /// Read the image from CSS `background-image` instead of attributes.
    pub image_from_background: bool,
    /// Link selectors tried in order; `:scope` means the card itself.
    pub links: &'static [&'static str],
}

/// Raw strings lifted from one product card.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapedItem {
    pub title: Option<String>,
    pub title_link: Option<String>,
    pub vendor: Option<String>,
    pub description: Option<String>,
    pub price_sale: Option<String>,
    pub price_regular: Option<String>,
    /// Image `src`, or the raw `background-image` declaration.
    pub image: Option<String>,
    /// `href` of the nearest anchor wrapping the image.
    pub image_link: Option<String>,
    pub link: Option<String>,
}

const SCRIPT_TEMPLATE: &str = r"(() => {
  const cfg = __SELECTORS__;
  const pick = (root, sel) => (sel ? root.querySelector(sel) : null);
  const text = (root, sel) => {
    const el = pick(root, sel);
    const t = el ? (el.textContent || '').trim() : '';
    return t.length ? t : null;
  };
  const href = (el) => (el && el.getAttribute('href')) || null;
  const image = (root) => {
    const el = pick(root, cfg.image);
    if (!el) return { src: null, link: null };
    let src = null;
    if (cfg.imageFromBackground) {
      const inline = el.getAttribute('style') || '';
      if (inline.includes('background-image')) {
        src = inline;
      } else {
        const computed = window.getComputedStyle(el).backgroundImage;
        src = computed && computed !== 'none' ? computed : null;
      }
    } else {
      for (const attr of cfg.imageAttrs) {
        const v = el.getAttribute(attr);
        if (v) { src = v; break; }
      }
    }
    return { src, link: href(el.closest('a')) };
  };
  const link = (root) => {
    for (const sel of cfg.links) {
      const v = sel === ':scope' ? href(root) : href(root.querySelector(sel));
      if (v) return v;
    }
    return null;
  };
  return Array.from(document.querySelectorAll(cfg.item)).map((card) => {
    try {
      const scope = cfg.priceScope ? card.querySelector(cfg.priceScope) : card;
      const img = image(card);
      return {
        title: text(card, cfg.title),
        titleLink: href(pick(card, cfg.titleLink)),
        vendor: text(card, cfg.vendor),
        description: text(card, cfg.description),
        priceSale: scope ? text(scope, cfg.priceSale) : null,
        priceRegular: scope ? text(scope, cfg.priceRegular) : null,
        image: img.src,
        imageLink: img.link,
        link: link(card),
      };
    } catch (e) {
      return null;
    }
  });
})()";

/// Renders the extraction script for a selector set.
pub(crate) fn render_script(selectors: &SelectorSet) -> Result<String, CrawlerError> {
    let json = serde_json::to_string(selectors).map_err(|source| CrawlerError::ScriptResult {
        context: "selector set".to_string(),
        source,
    })?;
    Ok(SCRIPT_TEMPLATE.replace("__SELECTORS__", &json))
}

/// Decodes the script result. Cards the script gave up on (`null`) or that do
/// not match the expected shape are dropped individually.
pub(crate) fn decode_items(value: Value) -> Result<Vec<ScrapedItem>, CrawlerError> {
    let Value::Array(entries) = value else {
        return Err(CrawlerError::Script(format!(
            "expected an array of cards, got {value}"
        )));
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            if entry.is_null() {
                tracing::debug!(index, "card skipped by in-page script");
                return None;
            }
            serde_json::from_value::<ScrapedItem>(entry)
                .inspect_err(|e| tracing::debug!(index, error = %e, "malformed card skipped"))
                .ok()
        })
        .collect())
}

/// Runs the extraction script and returns one entry per readable card.
pub(crate) async fn scrape_items(
    page: &dyn PageDriver,
    selectors: &SelectorSet,
) -> Result<Vec<ScrapedItem>, CrawlerError> {
    let script = render_script(selectors)?;
    let value = page.evaluate(&script).await?;
    decode_items(value)
}
