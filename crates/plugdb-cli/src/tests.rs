use super::*;
use crate::catalog::page_offset;
use crate::crawl::{build_plan, SiteArg};
use plugdb_core::CrawlerSettings;
use plugdb_crawler::Site;

fn crawl_args(argv: &[&str]) -> CrawlArgs {
    let mut full = vec!["plugdb", "crawl"];
    full.extend_from_slice(argv);
    match Cli::try_parse_from(full).expect("expected valid cli args").command {
        Some(Commands::Crawl(args)) => args,
        other => panic!("expected crawl command, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// db
// ---------------------------------------------------------------------------

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["plugdb", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["plugdb", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["plugdb"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

#[test]
fn parses_crawl_site_with_defaults() {
    let args = crawl_args(&["plugin-alliance"]);
    assert_eq!(args.site, SiteArg::PluginAlliance);
    assert_eq!(args.max_pages, None);
    assert!(!args.dry_run);
}

#[test]
fn parses_crawl_overrides() {
    let args = crawl_args(&[
        "slate-digital",
        "--max-pages",
        "2",
        "--min-delay",
        "100",
        "--max-delay",
        "200",
        "--dry-run",
    ]);
    assert_eq!(args.site, SiteArg::SlateDigital);
    assert_eq!(args.max_pages, Some(2));
    assert_eq!(args.min_delay, Some(100));
    assert_eq!(args.max_delay, Some(200));
    assert!(args.dry_run);
}

#[test]
fn unknown_site_is_rejected() {
    assert!(Cli::try_parse_from(["plugdb", "crawl", "waves"]).is_err());
}

#[test]
fn all_expands_to_every_site_in_order() {
    let plan = build_plan(&crawl_args(&["all"]), &CrawlerSettings::default()).unwrap();
    let sites: Vec<Site> = plan.iter().map(|(site, _)| *site).collect();
    assert_eq!(sites, Site::ALL.to_vec());
}

#[test]
fn plan_uses_site_page_budget_unless_overridden() {
    let settings = CrawlerSettings::default();

    let plan = build_plan(&crawl_args(&["plugin-alliance"]), &settings).unwrap();
    assert_eq!(plan[0].1.max_pages, 10);

    let plan = build_plan(&crawl_args(&["plugin-alliance", "--max-pages", "3"]), &settings).unwrap();
    assert_eq!(plan[0].1.max_pages, 3);
}

#[test]
fn plan_applies_delay_overrides() {
    let plan = build_plan(
        &crawl_args(&["plugin-alliance", "--min-delay", "10", "--max-delay", "20"]),
        &CrawlerSettings::default(),
    )
    .unwrap();
    assert_eq!(plan[0].1.page_delay.min_ms, 10);
    assert_eq!(plan[0].1.page_delay.max_ms, 20);
}

#[test]
fn inverted_delay_window_is_rejected() {
    let err = build_plan(
        &crawl_args(&["plugin-alliance", "--min-delay", "5000"]),
        &CrawlerSettings::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("--min-delay"));
}

#[test]
fn zero_max_pages_is_rejected() {
    assert!(build_plan(
        &crawl_args(&["plugin-alliance", "--max-pages", "0"]),
        &CrawlerSettings::default()
    )
    .is_err());
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

#[test]
fn parses_catalog_list_defaults() {
    let cli = Cli::try_parse_from(["plugdb", "catalog", "list"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Catalog {
            command: CatalogCommands::List {
                page: 1,
                per_page: 20,
                search: None
            }
        })
    ));
}

#[test]
fn parses_catalog_list_with_search() {
    let cli = Cli::try_parse_from([
        "plugdb", "catalog", "list", "--page", "3", "--per-page", "5", "--search", "comp",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Catalog {
            command: CatalogCommands::List {
                page: 3,
                per_page: 5,
                search: Some(ref s)
            }
        }) if s == "comp"
    ));
}

#[test]
fn parses_catalog_show() {
    let cli =
        Cli::try_parse_from(["plugdb", "catalog", "show", "fg-ds-902"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Catalog {
            command: CatalogCommands::Show { ref slug }
        }) if slug == "fg-ds-902"
    ));
}

#[test]
fn page_offsets() {
    assert_eq!(page_offset(1, 20), 0);
    assert_eq!(page_offset(3, 20), 40);
    assert_eq!(page_offset(0, 20), 0);
    assert_eq!(page_offset(-4, 20), 0);
}
