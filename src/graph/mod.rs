//! Crawl graph module
//!
//! This module contains the core mirroring logic:
//! - Fetch actions and page nodes, the two kinds of graph object
//! - The priority scheduler that orders them
//! - The href/src scanner and the page rewriter
//! - The crawl session that drains the scheduler

mod downloader;
mod object;
mod observer;
mod scanner;
mod scheduler;
mod segment;
mod session;

pub use downloader::{
    session_cookie, token_from_location, Downloader, FetchSettings, FetchedContent,
};
pub use object::{GraphObject, NodeId, ObjectKind, PageNode};
pub use observer::{CrawlObserver, LoggingObserver, NoopObserver, ProcessedEvent};
pub use scanner::{find_parameter, quoted_value, LinkScanner, ScanItem};
pub use scheduler::{ScheduleKey, Scheduler};
pub use segment::{RewrittenPage, StringSegment};
pub use session::Crawler;

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::storage::FsStorage;

/// Mirrors a site into the configured base directory
///
/// This is the main entry point for a crawl. It will:
/// 1. Queue the seed URL
/// 2. Fetch and store every resource reachable through `href`/`src` links
/// 3. Rewrite each page's links to point at the local copies
///
/// # Arguments
///
/// * `config` - The crawl configuration; `crawl.seed-url` must be set
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The crawl drained its queue
/// * `Err(MirrorError)` - The configuration could not start a crawl
pub async fn mirror(config: Config) -> crate::Result<CrawlSummary> {
    let storage = FsStorage::new(&config.crawl.base_directory);
    let mut crawler = Crawler::new(&config, storage)?;
    Ok(crawler.run().await)
}
