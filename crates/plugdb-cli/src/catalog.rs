//! `plugdb catalog`: read-only views over stored entries, using the
//! restricted credential.

use clap::Subcommand;
use plugdb_core::AppConfig;

#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// List entries, newest first
    List {
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 20)]
        per_page: i64,

        /// Case-insensitive filter on name, developer or description
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one entry by its URL slug
    Show { slug: String },
}

/// Row offset of a 1-based page. Pages below 1 are treated as 1.
pub(crate) fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(per_page.max(0))
}

pub(crate) async fn run_catalog(config: &AppConfig, command: CatalogCommands) -> anyhow::Result<()> {
    let pool = crate::connect(config, config.anon_credential.as_ref()).await?;

    match command {
        CatalogCommands::List {
            page,
            per_page,
            search,
        } => {
            if per_page < 1 {
                anyhow::bail!("--per-page must be at least 1");
            }
            let result = plugdb_db::list_catalog_entries(
                &pool,
                page_offset(page, per_page),
                per_page,
                search.as_deref(),
            )
            .await?;

            for entry in &result.entries {
                let price = entry
                    .price
                    .map_or_else(|| "-".to_string(), |p| format!("{p} {}", entry.currency));
                println!(
                    "{:<40} {:<24} {:>14}  {}",
                    entry.slug(),
                    entry.developer,
                    price,
                    entry.source
                );
            }
            let pages = (result.total + per_page - 1) / per_page;
            println!(
                "page {} of {} ({} entries)",
                page.max(1),
                pages.max(1),
                result.total
            );
        }
        CatalogCommands::Show { slug } => {
            let Some(entry) = plugdb_db::get_catalog_entry_by_slug(&pool, &slug).await? else {
                anyhow::bail!("no catalog entry with slug '{slug}'");
            };
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
    }

    Ok(())
}
