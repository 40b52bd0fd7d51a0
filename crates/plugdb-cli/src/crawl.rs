//! `plugdb crawl`: run the crawler, then persist and summarize its output.
//!
//! Every site gets its own `crawl_runs` row. A site that fails is recorded as
//! failed; the others are still saved.

use clap::{Args, ValueEnum};
use plugdb_core::{AppConfig, CrawlerSettings, ValidatedRecord};
use plugdb_crawler::{RunOptions, RunResult, Site, SiteOutcome};
use plugdb_db::{CrawlRunCounts, PgCatalogStore, SaveSummary};

use crate::fail_run_best_effort;

/// Records shown in the post-crawl sample.
const SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SiteArg {
    PluginAlliance,
    SlateDigital,
    SolidStateLogic,
    /// Every known site, one after another
    All,
}

impl SiteArg {
    #[must_use]
    pub fn sites(self) -> Vec<Site> {
        match self {
            SiteArg::PluginAlliance => vec![Site::PluginAlliance],
            SiteArg::SlateDigital => vec![Site::SlateDigital],
            SiteArg::SolidStateLogic => vec![Site::SolidStateLogic],
            SiteArg::All => Site::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Site to crawl
    #[arg(value_enum)]
    pub site: SiteArg,

    /// Maximum numbered listing pages (defaults to the site's own budget)
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Lower bound of the pause between listing pages, in milliseconds
    #[arg(long)]
    pub min_delay: Option<u64>,

    /// Upper bound of the pause between listing pages, in milliseconds
    #[arg(long)]
    pub max_delay: Option<u64>,

    /// Crawl and report without writing to the database
    #[arg(long)]
    pub dry_run: bool,
}

/// Resolves command-line overrides against configured settings into one
/// [`RunOptions`] per site.
///
/// # Errors
///
/// Returns an error if the delay window is inverted or `--max-pages` is zero.
pub(crate) fn build_plan(
    args: &CrawlArgs,
    settings: &CrawlerSettings,
) -> anyhow::Result<Vec<(Site, RunOptions)>> {
    let min_delay = args.min_delay.unwrap_or(settings.min_delay_ms);
    let max_delay = args.max_delay.unwrap_or(settings.max_delay_ms);
    if min_delay > max_delay {
        anyhow::bail!("--min-delay ({min_delay}) must not exceed --max-delay ({max_delay})");
    }
    if args.max_pages == Some(0) {
        anyhow::bail!("--max-pages must be at least 1");
    }

    let settings = CrawlerSettings {
        min_delay_ms: min_delay,
        max_delay_ms: max_delay,
        ..settings.clone()
    };

    Ok(args
        .site
        .sites()
        .into_iter()
        .map(|site| {
            let options = RunOptions::for_site(site, &settings);
            let options = match args.max_pages {
                Some(n) => options.with_max_pages(n),
                None => options,
            };
            (site, options)
        })
        .collect())
}

pub(crate) async fn run_crawl(config: &AppConfig, args: &CrawlArgs) -> anyhow::Result<()> {
    let plan = build_plan(args, &config.crawler)?;

    if args.dry_run {
        let results = plugdb_crawler::crawl(&config.crawler, &plan).await?;
        for result in &results {
            print_summary(result, None);
            print_sample(result)?;
        }
        println!("dry-run: nothing was written to the database");
        return Ok(());
    }

    let pool = crate::connect(config, config.service_credential.as_ref()).await?;

    let mut run_ids = Vec::with_capacity(plan.len());
    for (site, _) in &plan {
        let run = plugdb_db::create_crawl_run(&pool, site.meta().slug, "cli").await?;
        if let Err(e) = plugdb_db::start_crawl_run(&pool, run.id).await {
            fail_run_best_effort(&pool, run.id, &format!("{e:#}")).await;
            return Err(e.into());
        }
        run_ids.push(run.id);
    }

    let results = match plugdb_crawler::crawl(&config.crawler, &plan).await {
        Ok(results) => results,
        Err(e) => {
            let message = format!("{e:#}");
            for run_id in &run_ids {
                fail_run_best_effort(&pool, *run_id, &message).await;
            }
            return Err(e.into());
        }
    };

    let store = PgCatalogStore::new(pool.clone());
    for (result, run_id) in results.into_iter().zip(run_ids) {
        let label = result.site.meta().label;
        let failure = match &result.outcome {
            SiteOutcome::Aborted(reason) if result.outcome.is_failure() => {
                Some(format!("crawl aborted: {reason}"))
            }
            _ => None,
        };

        let records: Vec<ValidatedRecord> =
            result.records.iter().map(|r| r.record.clone()).collect();
        let summary = if records.is_empty() {
            SaveSummary::default()
        } else {
            plugdb_db::save_batch(&store, &records, label).await
        };
        print_summary(&result, Some(&summary));

        if let Some(message) = failure {
            fail_run_best_effort(&pool, run_id, &message).await;
            continue;
        }

        let counts = CrawlRunCounts {
            discovered: to_i32(result.discovered),
            saved: to_i32(summary.saved()),
            failed: to_i32(result.rejected + summary.errors),
        };
        if let Err(e) = plugdb_db::complete_crawl_run(&pool, run_id, counts).await {
            tracing::error!(run_id, site = label, error = %e, "failed to complete crawl run");
        }
    }

    Ok(())
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn print_summary(result: &RunResult, saved: Option<&SaveSummary>) {
    let label = result.site.meta().label;
    println!("== {label} ==");
    println!("  outcome:    {:?}", result.outcome);
    println!("  pages:      {}", result.pages_processed);
    if result.scroll_steps > 0 {
        println!("  scrolls:    {}", result.scroll_steps);
    }
    println!("  discovered: {}", result.discovered);
    println!("  validated:  {}", result.records.len());
    println!("  rejected:   {}", result.rejected);
    if let Some(summary) = saved {
        println!("  saved:      {}", summary.saved());
        println!("  updated:    {}", summary.skipped());
        println!("  failed:     {}", summary.errors);
    }
    if !result.errors.is_empty() {
        println!("  errors:");
        for error in &result.errors {
            println!("    - {error}");
        }
    }
}

fn print_sample(result: &RunResult) -> anyhow::Result<()> {
    let sample: Vec<_> = result
        .records
        .iter()
        .take(SAMPLE_SIZE)
        .map(|r| &r.record)
        .collect();
    if !sample.is_empty() {
        println!("  sample:\n{}", serde_json::to_string_pretty(&sample)?);
    }
    Ok(())
}
