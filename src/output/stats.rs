//! Crawl statistics
//!
//! This module provides the counters the crawl session keeps while draining its queue, and the
//! formatted report printed at the end of a run.

use crate::graph::{ObjectKind, ProcessedEvent};
use crate::output::CrawlSummary;
use crate::url::host_of;
use serde::Serialize;
use std::collections::BTreeSet;

/// A graph object that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ObjectKind,
    pub url: String,
    pub message: String,
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStatistics {
    /// Fetches that stored content or produced a page
    pub fetches_succeeded: u64,

    /// Fetches that failed
    pub fetches_failed: u64,

    /// Pages scanned and rewritten
    pub pages_parsed: u64,

    /// Pages whose scan or save failed
    pub parses_failed: u64,

    /// Deepest level processed
    pub max_level: u32,

    /// Hosts that had at least one object processed
    pub hosts: BTreeSet<String>,

    /// Every failure, in processing order
    pub failures: Vec<Failure>,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one processed object
    pub fn record(&mut self, event: &ProcessedEvent) {
        match (event.kind, event.success) {
            (ObjectKind::Fetch, true) => self.fetches_succeeded += 1,
            (ObjectKind::Fetch, false) => self.fetches_failed += 1,
            (ObjectKind::Parse, true) => self.pages_parsed += 1,
            (ObjectKind::Parse, false) => self.parses_failed += 1,
        }
        self.max_level = self.max_level.max(event.level);

        let host = host_of(&event.url);
        if !host.is_empty() {
            self.hosts.insert(host);
        }

        if let Some(message) = &event.error {
            self.record_failure(event.kind, &event.url, message);
        }
    }

    /// Notes a failure that happened outside the object being processed (a deferred page save)
    pub fn record_failure(&mut self, kind: ObjectKind, url: &str, message: &str) {
        self.failures.push(Failure {
            kind,
            url: url.to_string(),
            message: message.to_string(),
        });
    }

    /// Number of objects processed
    pub fn total_processed(&self) -> u64 {
        self.fetches_succeeded + self.fetches_failed + self.pages_parsed + self.parses_failed
    }

    pub fn total_failed(&self) -> u64 {
        self.fetches_failed + self.parses_failed
    }

    /// Percentage of processed objects that succeeded
    pub fn success_rate(&self) -> f64 {
        let total = self.total_processed();
        if total == 0 {
            return 0.0;
        }
        (total - self.total_failed()) as f64 / total as f64 * 100.0
    }
}

/// Prints a crawl summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The finished crawl to display
pub fn print_statistics(summary: &CrawlSummary) {
    let stats = &summary.statistics;

    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Seed: {}", summary.seed_url);
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {}s", summary.duration_seconds());
    println!("  URLs seen: {}", summary.urls_seen);
    println!("  Hosts: {}", stats.hosts.len());
    println!("  Deepest level: {}", stats.max_level);
    println!();

    println!("Objects:");
    println!(
        "  Fetches: {} succeeded, {} failed",
        stats.fetches_succeeded, stats.fetches_failed
    );
    println!(
        "  Pages: {} rewritten, {} failed",
        stats.pages_parsed, stats.parses_failed
    );
    if summary.pages_flushed_incomplete > 0 {
        println!(
            "  Pages saved with unresolved links: {}",
            summary.pages_flushed_incomplete
        );
    }
    println!();

    if !stats.failures.is_empty() {
        println!("Failures ({}):", stats.failures.len());
        for failure in &stats.failures {
            println!("  - [{}] {}: {}", failure.kind, failure.url, failure.message);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} objects processed)",
        stats.success_rate(),
        stats.total_processed() - stats.total_failed(),
        stats.total_processed()
    );
}
