use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use plugdb_core::CrawlerSettings;
use serde_json::{json, Value};

use super::*;
use crate::testing::{ScriptedPage, ScriptedSource};

fn options(site: Site) -> RunOptions {
    RunOptions {
        page_delay: DelayWindow::new(10, 20),
        scroll: ScrollSettings {
            step_delay: DelayWindow::new(10, 20),
            ..ScrollSettings::default()
        },
        ..RunOptions::for_site(site, &CrawlerSettings::default())
    }
}

fn pa_card(name: &str, price: &str) -> Value {
    json!({
        "title": name,
        "titleLink": format!("/products/{}", name.to_lowercase().replace(' ', "-")),
        "vendor": "Brainworx",
        "priceRegular": price,
        "image": "//www.plugin-alliance.com/cdn/shop/files/card.png",
    })
}

// ---------------------------------------------------------------------------
// options
// ---------------------------------------------------------------------------

#[test]
fn options_follow_settings_and_site_budget() {
    let settings = CrawlerSettings {
        min_delay_ms: 100,
        max_delay_ms: 200,
        max_scrolls: 7,
        ..CrawlerSettings::default()
    };
    let opts = RunOptions::for_site(Site::PluginAlliance, &settings);
    assert_eq!(opts.max_pages, 10);
    assert_eq!(opts.page_delay, DelayWindow::new(100, 200));
    assert_eq!(opts.scroll.max_scrolls, 7);
    assert_eq!(opts.max_page_errors, 3);
    assert_eq!(opts.with_max_pages(2).max_pages, 2);
}

// ---------------------------------------------------------------------------
// identity tokens
// ---------------------------------------------------------------------------

#[test]
fn identity_tokens_are_unique_and_slug_like() {
    let a = identity_token("Fresh Air", "Slate Digital");
    let b = identity_token("Fresh Air", "Slate Digital");
    assert_ne!(a, b);
    assert!(a.starts_with("fresh-air-slate-digital-"));
    assert!(!a.contains(char::is_whitespace));
}

#[test]
fn identity_token_defaults_developer() {
    assert!(identity_token("Ghost", "").starts_with("ghost-unknown-"));
}

// ---------------------------------------------------------------------------
// numbered traversal
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn numbered_crawl_stops_at_first_empty_page() {
    let page = ScriptedPage::new()
        .with_extraction(json!([
            pa_card("Lindell 80", "$149.00"),
            pa_card("Shadow Hills", "$199.00")
        ]))
        .with_extraction(json!([pa_card("bx_digital V3", "$299.00")]))
        .with_extraction(json!([]));

    let result = run_site(&page, Site::PluginAlliance, &options(Site::PluginAlliance)).await;

    assert_eq!(result.records.len(), 3);
    assert_eq!(result.pages_processed, 2);
    assert_eq!(result.outcome, SiteOutcome::Aborted(AbortReason::EmptyPage { page: 3 }));
    assert!(!result.outcome.is_failure());
    assert!(result.errors.is_empty());
    assert_eq!(
        page.visited(),
        vec![
            "https://www.plugin-alliance.com/collections/all-products",
            "https://www.plugin-alliance.com/collections/all-products?page=2",
            "https://www.plugin-alliance.com/collections/all-products?page=3",
        ]
    );
    assert_eq!(result.records[0].record.developer, "Brainworx");
    assert_eq!(result.records[0].record.price, Some(149.0));
}

#[tokio::test(start_paused = true)]
async fn numbered_crawl_respects_page_budget() {
    let page = ScriptedPage::new()
        .with_extraction(json!([pa_card("Lindell 80", "$149.00")]))
        .with_extraction(json!([pa_card("Shadow Hills", "$199.00")]))
        .with_extraction(json!([pa_card("Never Reached", "$99.00")]));

    let opts = options(Site::PluginAlliance).with_max_pages(2);
    let result = run_site(&page, Site::PluginAlliance, &opts).await;

    assert_eq!(result.outcome, SiteOutcome::Completed);
    assert_eq!(result.pages_processed, 2);
    assert_eq!(page.visited().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn page_of_only_invalid_records_stops_the_site() {
    let mut broken = pa_card("Broken Link", "$10.00");
    broken["titleLink"] = json!("https://");
    let page = ScriptedPage::new()
        .with_extraction(json!([broken]))
        .with_extraction(json!([pa_card("Never Reached", "$99.00")]));

    let result = run_site(&page, Site::PluginAlliance, &options(Site::PluginAlliance)).await;

    assert!(result.records.is_empty());
    assert_eq!(result.rejected, 1);
    assert_eq!(result.pages_processed, 0);
    assert_eq!(result.outcome, SiteOutcome::Aborted(AbortReason::NoValidRecords { page: 1 }));
    assert!(result.errors[0].starts_with("record validation failed for Broken Link"));
}

#[tokio::test(start_paused = true)]
async fn one_bad_record_does_not_sink_the_page() {
    let mut broken = pa_card("Broken Link", "$10.00");
    broken["titleLink"] = json!("https://");
    let page = ScriptedPage::new()
        .with_extraction(json!([broken, pa_card("Lindell 80", "$149.00"), null]))
        .with_extraction(json!([]));

    let result = run_site(&page, Site::PluginAlliance, &options(Site::PluginAlliance)).await;

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.discovered, 2);
    assert_eq!(result.rejected, 1);
    assert_eq!(result.pages_processed, 1);
}

#[tokio::test(start_paused = true)]
async fn three_page_errors_abandon_the_site() {
    let page = ScriptedPage::new()
        .with_failed_extraction("boom 1")
        .with_failed_extraction("boom 2")
        .with_failed_extraction("boom 3")
        .with_extraction(json!([pa_card("Never Reached", "$99.00")]));

    let result = run_site(&page, Site::PluginAlliance, &options(Site::PluginAlliance)).await;

    assert_eq!(
        result.outcome,
        SiteOutcome::Aborted(AbortReason::TooManyPageErrors { count: 3 })
    );
    assert!(result.outcome.is_failure());
    assert_eq!(result.errors.len(), 3);
    assert!(result.errors[0].starts_with("page 1 crawl error:"));
    assert!(result.errors[2].starts_with("page 3 crawl error:"));
    assert_eq!(page.visited().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_page_is_skipped_not_retried() {
    let page = ScriptedPage::new()
        .with_failed_extraction("transient")
        .with_extraction(json!([pa_card("Lindell 80", "$149.00")]))
        .with_extraction(json!([]));

    let result = run_site(&page, Site::PluginAlliance, &options(Site::PluginAlliance)).await;

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(page.visited().len(), 3);
    assert!(page.visited()[1].ends_with("?page=2"));
}

#[tokio::test(start_paused = true)]
async fn page_after_a_failed_page_still_waits_the_page_delay() {
    let page = ScriptedPage::new()
        .with_failed_extraction("transient")
        .with_extraction(json!([pa_card("Lindell 80", "$149.00")]))
        .with_extraction(json!([pa_card("Shadow Hills", "$199.00")]));
    let opts = RunOptions {
        page_delay: DelayWindow::new(10_000, 10_000),
        ..options(Site::PluginAlliance)
    }
    .with_max_pages(3);

    let result = run_site(&page, Site::PluginAlliance, &opts).await;

    assert_eq!(result.records.len(), 2);
    let at = page.visited_at();
    assert_eq!(at.len(), 3);
    assert!(at[1] - at[0] >= Duration::from_secs(10));
    assert!(at[2] - at[1] >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn no_page_delay_after_the_last_page() {
    let page = ScriptedPage::new()
        .with_extraction(json!([pa_card("Lindell 80", "$149.00")]))
        .with_extraction(json!([pa_card("Shadow Hills", "$199.00")]));
    let opts = RunOptions {
        page_delay: DelayWindow::new(10_000, 10_000),
        ..options(Site::PluginAlliance)
    }
    .with_max_pages(2);

    let result = run_site(&page, Site::PluginAlliance, &opts).await;
    let finished = tokio::time::Instant::now();

    assert_eq!(result.pages_processed, 2);
    let at = page.visited_at();
    assert_eq!(at.len(), 2);
    assert!(finished - at[1] < Duration::from_secs(10));
}

// ---------------------------------------------------------------------------
// infinite scroll and single page
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn scrolling_site_extracts_once_after_growth_stops() {
    let cards = json!([
        {"title": "Fresh Air", "link": "/plugins/fresh-air", "image": "/media/fa.png"},
        {"title": "VMR", "link": "/plugins/vmr"},
    ]);
    let page = ScriptedPage::new()
        .with_counts(&[8, 16, 16, 16, 16])
        .with_extraction(cards);

    let result = run_site(&page, Site::SlateDigital, &options(Site::SlateDigital)).await;

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.scroll_steps, 4);
    assert_eq!(page.evaluations.load(Ordering::SeqCst), 1);
    assert_eq!(page.visited(), vec!["https://slatedigital.com/plugins"]);
    assert_eq!(result.records[1].record.developer, "Slate Digital");
    assert_eq!(result.outcome, SiteOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn single_page_site_without_cards_is_empty_not_failed() {
    let page = ScriptedPage::new().without_cards();

    let result = run_site(&page, Site::SolidStateLogic, &options(Site::SolidStateLogic)).await;

    assert!(result.records.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(result.outcome, SiteOutcome::Completed);
}

// ---------------------------------------------------------------------------
// session lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn session_is_closed_after_a_failing_site() {
    let page = Arc::new(
        ScriptedPage::new()
            .with_failed_extraction("a")
            .with_failed_extraction("b")
            .with_failed_extraction("c"),
    );
    let source = ScriptedSource::with_pages(vec![Arc::clone(&page)]);
    let closes = Arc::clone(&source.closes);

    let results = crawl_sites(
        source,
        &[(Site::PluginAlliance, options(Site::PluginAlliance))],
    )
    .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].outcome.is_failure());
    assert!(page.closed.load(Ordering::SeqCst));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unavailable_page_skips_only_that_site() {
    let page = Arc::new(ScriptedPage::new().with_extraction(json!([
        {"title": "Bus Compressor 2", "link": "/products/plugins/bus-compressor-2"}
    ])));
    // one page for two sites: the second site finds the source exhausted
    let source = ScriptedSource::with_pages(vec![page]);
    let closes = Arc::clone(&source.closes);

    let results = crawl_sites(
        source,
        &[
            (Site::SolidStateLogic, options(Site::SolidStateLogic)),
            (Site::SlateDigital, options(Site::SlateDigital)),
        ],
    )
    .await;

    assert_eq!(results[0].records.len(), 1);
    assert_eq!(
        results[1].outcome,
        SiteOutcome::Aborted(AbortReason::PageUnavailable)
    );
    assert!(results[1].errors[0].starts_with("could not open page"));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}
