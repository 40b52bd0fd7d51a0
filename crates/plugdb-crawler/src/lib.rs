pub mod error;
pub mod normalize;
pub mod pacing;
pub mod page;
pub mod runner;
pub mod session;
pub mod sites;
pub mod traversal;
pub mod validate;

#[cfg(test)]
mod testing;

pub use error::CrawlerError;
pub use page::{ChromePage, PageDriver};
pub use runner::{
    crawl, crawl_sites, identity_token, run_site, AbortReason, CrawledRecord, RunOptions,
    RunResult, RunState, SiteOutcome,
};
pub use session::{BrowserSession, PageSource};
pub use sites::{Site, SiteStrategy, Traversal};
pub use validate::{validate_record, RejectReason, RejectedRecord, ValidationOutcome};
