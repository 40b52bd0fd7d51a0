//! Moving around a listing: numbered page URLs, navigation, and the
//! scroll-until-nothing-new loop for infinite listings.

use std::time::Duration;

use crate::error::CrawlerError;
use crate::pacing::{self, DelayWindow};
use crate::page::PageDriver;
use crate::sites::SiteMeta;

/// URL of listing page `page_number` (1-based). The first page is the bare
/// listing URL; later pages add `?page=N`.
#[must_use]
pub fn page_url(meta: &SiteMeta, page_number: usize) -> String {
    let base = meta.listing_url();
    if page_number <= 1 {
        base
    } else {
        format!("{base}?page={page_number}")
    }
}

/// Loads `url` and lets it settle.
///
/// A navigation that merely runs past `timeout` is logged and the crawl
/// continues with whatever has rendered. The follow-up network-idle wait is
/// tolerated the same way.
///
/// # Errors
///
/// Returns [`CrawlerError`] when navigation fails outright.
pub async fn navigate(
    page: &dyn PageDriver,
    url: &str,
    timeout: Duration,
) -> Result<(), CrawlerError> {
    proceed_on_timeout(page.goto(url, timeout).await, url)?;
    proceed_on_timeout(page.wait_for_network_idle(timeout).await, url)?;
    pacing::pause(DelayWindow::SETTLE).await;
    Ok(())
}

/// Treats a timed-out wait as success.
fn proceed_on_timeout(
    result: Result<(), CrawlerError>,
    waiting_for: &str,
) -> Result<(), CrawlerError> {
    match result {
        Err(e) if e.is_timeout() => {
            tracing::debug!(waiting_for, error = %e, "wait timed out; proceeding");
            Ok(())
        }
        other => other,
    }
}

/// Knobs for [`scroll_until_exhausted`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSettings {
    /// Hard cap on scroll steps.
    pub max_scrolls: usize,
    /// Consecutive steps without new items before the listing counts as
    /// exhausted.
    pub no_growth_threshold: usize,
    /// Scroll distance as a fraction of the viewport height.
    pub viewport_fraction: f64,
    pub step_delay: DelayWindow,
    /// Bound on the loading-indicator and network-idle waits after each step.
    pub wait_timeout: Duration,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            max_scrolls: 50,
            no_growth_threshold: 3,
            viewport_fraction: 0.8,
            step_delay: DelayWindow::SCROLL,
            wait_timeout: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    /// Scroll steps actually taken.
    pub steps: usize,
    /// Item count at the last observation.
    pub final_count: usize,
    /// `true` when growth stopped, `false` when the step cap ended the loop.
    pub exhausted: bool,
}

/// Scrolls an infinite listing until it stops growing or the step cap is hit.
///
/// Before each step the item count is compared with the previous
/// observation. `no_growth_threshold` consecutive unchanged counts end the
/// loop. Otherwise the page is scrolled, paced, and given a bounded chance to
/// finish loading before the next observation.
///
/// # Errors
///
/// Returns [`CrawlerError`] if counting or scrolling fails. Timed-out waits
/// are not errors.
pub async fn scroll_until_exhausted(
    page: &dyn PageDriver,
    item_selector: &str,
    loading_selector: Option<&str>,
    settings: &ScrollSettings,
) -> Result<ScrollReport, CrawlerError> {
    let mut steps = 0;
    let mut previous = 0;
    let mut unchanged = 0;
    let mut exhausted = false;

    while steps < settings.max_scrolls {
        let current = page.count(item_selector).await?;
        if current == previous && steps > 0 {
            unchanged += 1;
            if unchanged >= settings.no_growth_threshold {
                tracing::info!(items = current, steps, "listing stopped growing");
                exhausted = true;
                break;
            }
        } else {
            unchanged = 0;
        }
        previous = current;

        page.scroll_by_viewport(settings.viewport_fraction).await?;
        pacing::pause(settings.step_delay).await;

        if let Some(loading) = loading_selector {
            proceed_on_timeout(
                page.wait_for_hidden(loading, settings.wait_timeout).await,
                loading,
            )?;
        }
        proceed_on_timeout(
            page.wait_for_network_idle(settings.wait_timeout).await,
            item_selector,
        )?;

        steps += 1;
        tracing::debug!(step = steps, items = current, "scrolled listing");
    }

    if !exhausted {
        tracing::info!(
            max_scrolls = settings.max_scrolls,
            items = previous,
            "scroll cap reached"
        );
    }

    Ok(ScrollReport {
        steps,
        final_count: previous,
        exhausted,
    })
}
