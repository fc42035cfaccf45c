//! Output module for reporting crawl results
//!
//! This module handles:
//! - Counting processed objects while a crawl runs
//! - Summarising a finished crawl
//! - Printing the end-of-run report

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics, Failure};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one crawl session
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub seed_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub statistics: CrawlStatistics,
    /// Distinct links registered in the URL pool
    pub urls_seen: usize,
    /// Pages saved at the end of the crawl with links still unresolved
    pub pages_flushed_incomplete: usize,
}

impl CrawlSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
