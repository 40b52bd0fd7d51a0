//! The crawl orchestrator.
//!
//! One browser session, one page in flight, one site at a time. A run never
//! fails because some pages or records did; those land in the site's error
//! list. Only failing to obtain a browser at all is an `Err`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use plugdb_core::{CrawlerSettings, RawCandidateRecord, ValidatedRecord, UNKNOWN_DEVELOPER};
use rand::Rng;

use crate::error::CrawlerError;
use crate::pacing::{self, DelayWindow};
use crate::page::PageDriver;
use crate::session::{BrowserSession, PageSource};
use crate::sites::{Site, Traversal};
use crate::traversal::{navigate, page_url, scroll_until_exhausted, ScrollSettings};
use crate::validate::{validate_record, ValidationOutcome};

/// Per-site crawl limits and pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Upper bound on numbered listing pages.
    pub max_pages: usize,
    /// Pause between numbered pages.
    pub page_delay: DelayWindow,
    /// Page-level failures tolerated before the site is abandoned.
    pub max_page_errors: usize,
    pub scroll: ScrollSettings,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
}

impl RunOptions {
    /// Options for `site` from configured crawler settings, using the site's
    /// own page budget.
    #[must_use]
    pub fn for_site(site: Site, settings: &CrawlerSettings) -> Self {
        Self {
            max_pages: site.meta().default_max_pages,
            page_delay: DelayWindow::new(settings.min_delay_ms, settings.max_delay_ms),
            max_page_errors: settings.max_page_errors,
            scroll: ScrollSettings {
                max_scrolls: settings.max_scrolls,
                ..ScrollSettings::default()
            },
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
            selector_timeout: Duration::from_secs(settings.selector_timeout_secs),
        }
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// Lifecycle of a crawl invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Initializing,
    Running,
    Draining,
    Done,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Initializing => "initializing",
            RunState::Running => "running",
            RunState::Draining => "draining",
            RunState::Done => "done",
        };
        f.write_str(s)
    }
}

fn enter(state: RunState) {
    tracing::debug!(state = %state, "crawl state");
}

/// Why a site's crawl stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    TooManyPageErrors { count: usize },
    /// A numbered page returned no cards at all.
    EmptyPage { page: usize },
    /// A numbered page returned cards but none survived validation.
    NoValidRecords { page: usize },
    /// The session could not open a tab for the site.
    PageUnavailable,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::TooManyPageErrors { count } => write!(f, "{count} page errors"),
            AbortReason::EmptyPage { page } => write!(f, "page {page} was empty"),
            AbortReason::NoValidRecords { page } => {
                write!(f, "page {page} produced no valid records")
            }
            AbortReason::PageUnavailable => write!(f, "no page could be opened"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteOutcome {
    Completed,
    Aborted(AbortReason),
}

impl SiteOutcome {
    /// `true` when pages kept failing or none could be opened. Reaching an
    /// empty or unusable listing page is a normal end of the crawl.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SiteOutcome::Aborted(
                AbortReason::TooManyPageErrors { .. } | AbortReason::PageUnavailable
            )
        )
    }
}

/// A validated record tagged with a token unique within this process.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawledRecord {
    pub token: String,
    pub record: ValidatedRecord,
}

/// Everything one site's crawl produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub site: Site,
    pub records: Vec<CrawledRecord>,
    /// Page failures and record rejections, in the order they happened.
    pub errors: Vec<String>,
    /// Listing pages whose records were accepted.
    pub pages_processed: usize,
    pub scroll_steps: usize,
    /// Cards that made it past extraction, valid or not.
    pub discovered: usize,
    pub rejected: usize,
    pub outcome: SiteOutcome,
}

impl RunResult {
    fn new(site: Site) -> Self {
        Self {
            site,
            records: Vec::new(),
            errors: Vec::new(),
            pages_processed: 0,
            scroll_steps: 0,
            discovered: 0,
            rejected: 0,
            outcome: SiteOutcome::Completed,
        }
    }

    /// Validates and keeps `raw`, returning how many records survived.
    fn accept(&mut self, raw: Vec<RawCandidateRecord>) -> usize {
        let mut accepted = 0;
        for candidate in raw {
            self.discovered += 1;
            match validate_record(candidate) {
                ValidationOutcome::Valid(record) => {
                    let token = identity_token(&record.name, &record.developer);
                    self.records.push(CrawledRecord { token, record });
                    accepted += 1;
                }
                ValidationOutcome::Rejected(rejected) => {
                    let message = rejected.summary();
                    tracing::warn!(site = %self.site, "{message}");
                    self.rejected += 1;
                    self.errors.push(message);
                }
            }
        }
        accepted
    }
}

static TOKEN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Builds a transient in-run reference for a record from its name, developer,
/// the wall clock, a random component and a process-wide sequence number.
#[must_use]
pub fn identity_token(name: &str, developer: &str) -> String {
    let developer = if developer.trim().is_empty() {
        UNKNOWN_DEVELOPER
    } else {
        developer
    };
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let nonce: u32 = rand::rng().random();
    let sequence = TOKEN_SEQUENCE.fetch_add(1, Ordering::Relaxed);

    format!("{name}-{developer}-{millis}-{nonce:08x}-{sequence}")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Crawls one site on an already-open page.
///
/// Never fails: page errors and rejected records are collected in the
/// result, and the traversal stops early on the abort conditions described
/// by [`AbortReason`].
pub async fn run_site(page: &dyn PageDriver, site: Site, options: &RunOptions) -> RunResult {
    let meta = site.meta();
    tracing::info!(site = meta.label, mode = ?meta.traversal, "crawling site");

    let mut result = RunResult::new(site);
    match meta.traversal {
        Traversal::Numbered => run_numbered(page, site, options, &mut result).await,
        Traversal::InfiniteScroll => run_scrolling(page, site, options, &mut result).await,
        Traversal::SinglePage => run_single(page, site, options, &mut result).await,
    }

    tracing::info!(
        site = meta.label,
        records = result.records.len(),
        rejected = result.rejected,
        errors = result.errors.len(),
        pages = result.pages_processed,
        outcome = ?result.outcome,
        "site crawl finished"
    );
    result
}

/// Records a page failure. Returns `true` once the error budget is spent.
fn page_failed(
    result: &mut RunResult,
    page_number: usize,
    error: &CrawlerError,
    page_errors: &mut usize,
    options: &RunOptions,
) -> bool {
    *page_errors += 1;
    let message = format!("page {page_number} crawl error: {error}");
    tracing::warn!(
        site = %result.site,
        page = page_number,
        error = %error,
        "page crawl failed"
    );
    result.errors.push(message);

    if *page_errors >= options.max_page_errors {
        tracing::error!(
            site = %result.site,
            count = *page_errors,
            "too many page errors; abandoning site"
        );
        result.outcome = SiteOutcome::Aborted(AbortReason::TooManyPageErrors {
            count: *page_errors,
        });
        return true;
    }
    false
}

async fn run_numbered(
    page: &dyn PageDriver,
    site: Site,
    options: &RunOptions,
    result: &mut RunResult,
) {
    let meta = site.meta();
    let strategy = site.strategy();
    let mut page_errors = 0;

    for page_number in 1..=options.max_pages {
        // paced before every page but the first, failed predecessors included
        if page_number > 1 {
            pacing::pause(options.page_delay).await;
        }

        let url = page_url(meta, page_number);
        tracing::info!(site = meta.label, page = page_number, url = %url, "crawling listing page");

        let extracted = match navigate(page, &url, options.navigation_timeout).await {
            Ok(()) => strategy.extract(page, options.selector_timeout).await,
            Err(e) => Err(e),
        };

        let raw = match extracted {
            Ok(raw) => raw,
            Err(e) => {
                if page_failed(result, page_number, &e, &mut page_errors, options) {
                    return;
                }
                continue;
            }
        };

        if raw.is_empty() {
            tracing::info!(site = meta.label, page = page_number, "no cards; end of listing");
            result.outcome = SiteOutcome::Aborted(AbortReason::EmptyPage { page: page_number });
            return;
        }

        if result.accept(raw) == 0 {
            tracing::warn!(
                site = meta.label,
                page = page_number,
                "no valid records on page; stopping"
            );
            result.outcome =
                SiteOutcome::Aborted(AbortReason::NoValidRecords { page: page_number });
            return;
        }
        result.pages_processed += 1;
    }
}

async fn run_scrolling(
    page: &dyn PageDriver,
    site: Site,
    options: &RunOptions,
    result: &mut RunResult,
) {
    let meta = site.meta();
    let outcome = async {
        navigate(page, &meta.listing_url(), options.navigation_timeout).await?;
        let report = scroll_until_exhausted(
            page,
            meta.item_selector,
            meta.loading_selector,
            &options.scroll,
        )
        .await?;
        let raw = site.strategy().extract(page, options.selector_timeout).await?;
        Ok::<_, CrawlerError>((report, raw))
    }
    .await;

    match outcome {
        Ok((report, raw)) => {
            result.scroll_steps = report.steps;
            result.accept(raw);
            result.pages_processed = 1;
        }
        Err(e) => {
            let mut page_errors = 0;
            page_failed(result, 1, &e, &mut page_errors, options);
        }
    }
}

async fn run_single(
    page: &dyn PageDriver,
    site: Site,
    options: &RunOptions,
    result: &mut RunResult,
) {
    let meta = site.meta();
    let outcome = async {
        navigate(page, &meta.listing_url(), options.navigation_timeout).await?;
        let visible = page.count(meta.item_selector).await?;
        tracing::info!(site = meta.label, items = visible, "listing loaded");
        site.strategy().extract(page, options.selector_timeout).await
    }
    .await;

    match outcome {
        Ok(raw) => {
            result.accept(raw);
            result.pages_processed = 1;
        }
        Err(e) => {
            let mut page_errors = 0;
            page_failed(result, 1, &e, &mut page_errors, options);
        }
    }
}

/// Crawls each planned site in order on pages from `source`, then closes the
/// source whatever happened.
///
/// A site whose page cannot be opened is reported as
/// [`AbortReason::PageUnavailable`]; later sites still run.
pub async fn crawl_sites<S: PageSource>(
    mut source: S,
    plan: &[(Site, RunOptions)],
) -> Vec<RunResult> {
    enter(RunState::Running);
    let mut results = Vec::with_capacity(plan.len());

    for (site, options) in plan {
        let page = match source.new_page().await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(site = %site, error = %e, "could not open page");
                let mut result = RunResult::new(*site);
                result.errors.push(format!("could not open page: {e}"));
                result.outcome = SiteOutcome::Aborted(AbortReason::PageUnavailable);
                results.push(result);
                continue;
            }
        };

        results.push(run_site(&page, *site, options).await);

        if let Err(e) = page.close().await {
            tracing::warn!(site = %site, error = %e, "failed to close page");
        }
    }

    enter(RunState::Draining);
    source.close().await;
    enter(RunState::Done);
    results
}

/// Launches a browser session from `settings` and crawls the plan with it.
///
/// # Errors
///
/// Returns [`CrawlerError`] only when no browser session can be acquired.
pub async fn crawl(
    settings: &CrawlerSettings,
    plan: &[(Site, RunOptions)],
) -> Result<Vec<RunResult>, CrawlerError> {
    enter(RunState::Idle);
    enter(RunState::Initializing);
    let session = BrowserSession::launch(settings).await?;
    Ok(crawl_sites(session, plan).await)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
