//! Crawl session - the drain loop over the graph scheduler
//!
//! The session owns every piece of shared crawl state: the scheduler queue, the connection cache,
//! the URL pool, the host regulator and the pages still waiting for link resolutions. Objects are
//! popped and processed one at a time; a failing object is reported and the loop moves on.

use crate::config::{validate_seed_url, Config};
use crate::connections::ConnectionCache;
use crate::graph::{
    CrawlObserver, Downloader, FetchSettings, FetchedContent, GraphObject, LinkScanner,
    LoggingObserver, NodeId, ObjectKind, PageNode, ProcessedEvent, RewrittenPage, ScanItem,
    Scheduler,
};
use crate::output::{CrawlStatistics, CrawlSummary};
use crate::pool::{pool_key, Subscription, UrlPool};
use crate::storage::Storage;
use crate::url::{is_followable, resolve, split_fragment, HostRegulator};
use crate::ConfigError;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Instant;

/// A scanned page waiting for some of its links to resolve
struct PendingPage {
    url: String,
    inducing: Downloader,
    page: RewrittenPage,
}

/// One crawl from a seed URL into a storage backend
pub struct Crawler<S: Storage> {
    settings: FetchSettings,
    save_original_pages: bool,
    max_depth: u32,
    scheduler: Scheduler,
    connections: ConnectionCache,
    pool: UrlPool<NodeId>,
    regulator: HostRegulator,
    pending: BTreeMap<NodeId, PendingPage>,
    storage: S,
    observer: Box<dyn CrawlObserver + Send>,
    statistics: CrawlStatistics,
    next_node_id: NodeId,
}

impl<S: Storage> Crawler<S> {
    /// Creates a session with the seed fetch queued
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration; `crawl.seed-url` must be set
    /// * `storage` - Where fetched content is written
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(MirrorError::Config)` - Missing or invalid seed URL
    pub fn new(config: &Config, storage: S) -> crate::Result<Self> {
        let seed = config
            .crawl
            .seed_url
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| ConfigError::Validation("seed-url is required".to_string()))?;
        validate_seed_url(seed)?;

        let mut regulator = HostRegulator::new();
        let seed = regulator.regulate(seed);

        let connection = &config.connection;
        let settings = FetchSettings {
            headers: config.request.headers(),
            use_referrer: config.crawl.use_referrer,
            max_session_attempts: connection.max_session_attempts,
            max_redirects: connection.max_redirects,
        };

        let mut crawler = Self {
            settings,
            save_original_pages: config.crawl.save_original_pages,
            max_depth: config.crawl.max_depth,
            scheduler: Scheduler::new(seed.clone()),
            connections: ConnectionCache::new(connection.max_agents, connection.connect_options()),
            pool: UrlPool::new(),
            regulator,
            pending: BTreeMap::new(),
            storage,
            observer: Box::new(LoggingObserver),
            statistics: CrawlStatistics::new(),
            next_node_id: 0,
        };

        crawler.pool.register(&seed);
        crawler.scheduler.insert(
            GraphObject::Fetch(Downloader::new(seed, 0, None)),
            &crawler.connections,
        );
        Ok(crawler)
    }

    /// Replaces the default logging observer
    pub fn with_observer(mut self, observer: impl CrawlObserver + Send + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn seed_url(&self) -> &str {
        self.scheduler.seed_url()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.statistics
    }

    /// Number of objects still queued
    pub fn queued(&self) -> usize {
        self.scheduler.len()
    }

    /// Drains the queue
    ///
    /// Every popped object is reported to the observer with its outcome. Pages still waiting for
    /// link resolutions when the queue runs dry are saved with those links left absolute.
    pub async fn run(&mut self) -> CrawlSummary {
        tracing::info!("Starting crawl of {}", self.seed_url());

        let started_at = Utc::now();
        let start_time = Instant::now();
        let mut processed: u64 = 0;

        while let Some(object) = self.scheduler.pop_min() {
            let kind = object.kind();
            let level = object.level();
            let url = object.url().unwrap_or_default().to_string();
            tracing::debug!("Processing {} {} (level {})", kind, url, level);

            let result = match object {
                GraphObject::Fetch(downloader) => self.perform(downloader).await,
                GraphObject::Parse(node) => self.analyze(node),
            };

            let event = match result {
                Ok(()) => ProcessedEvent::succeeded(kind, level, url),
                Err(e) => ProcessedEvent::failed(kind, level, url, e),
            };
            self.statistics.record(&event);
            self.observer.on_processed(&event);

            processed += 1;
            if processed % 10 == 0 {
                let rate = processed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} objects processed, {} queued, {:.2} objects/sec",
                    processed,
                    self.scheduler.len(),
                    rate
                );
            }
        }

        let pages_flushed_incomplete = self.flush_pending();

        tracing::info!(
            "Crawl completed: {} objects processed in {:?}",
            processed,
            start_time.elapsed()
        );

        CrawlSummary {
            seed_url: self.seed_url().to_string(),
            started_at,
            finished_at: Utc::now(),
            statistics: self.statistics.clone(),
            urls_seen: self.pool.len(),
            pages_flushed_incomplete,
        }
    }

    /// Fetches one URL and hands its content on
    async fn perform(&mut self, mut downloader: Downloader) -> crate::Result<()> {
        let outcome = downloader
            .perform(&mut self.connections, &self.settings)
            .await;
        self.record_actual_url(&downloader);

        match outcome? {
            FetchedContent::Page(text) => {
                if self.save_original_pages {
                    downloader.save_text(&mut self.storage, &text)?;
                }
                let id = self.next_node_id;
                self.next_node_id += 1;
                let node = PageNode::new(id, downloader.level() + 1, text, downloader);
                self.scheduler
                    .insert(GraphObject::Parse(node), &self.connections);
            }
            FetchedContent::Data(bytes) => {
                tracing::debug!("Saving {} bytes for {}", bytes.len(), downloader.actual_url());
                downloader.save_bytes(&mut self.storage, &bytes)?;
            }
        }
        Ok(())
    }

    /// Publishes where a fetch ended up and fills the pages waiting on it
    fn record_actual_url(&mut self, downloader: &Downloader) {
        let original = downloader.url();
        let actual = downloader.actual_url();
        let source = downloader.source_url().unwrap_or(original);

        let mut waiting = Vec::new();
        self.pool.set_actual_url(source, original, actual, |id, recorded| {
            waiting.push((id, recorded.to_string()))
        });
        if actual != original && !self.pool.is_in_pool(actual) {
            self.pool.set_actual_url(source, actual, actual, |_, _| {});
        }

        let key = pool_key(original);
        for (id, recorded) in waiting {
            self.fill_pending(id, &key, &recorded);
        }
    }

    fn fill_pending(&mut self, id: NodeId, key: &str, actual: &str) {
        let Some(pending) = self.pending.get_mut(&id) else {
            return;
        };
        pending.page.resolve(&pending.url, key, actual);
        if !pending.page.is_complete() {
            return;
        }

        if let Some(pending) = self.pending.remove(&id) {
            tracing::debug!("All links of {} resolved, saving", pending.url);
            self.save_page(&pending);
        }
    }

    /// Scans a page, queues fetches for new links and saves it once every link is resolved
    fn analyze(&mut self, node: PageNode) -> crate::Result<()> {
        let id = node.id();
        let level = node.level();
        let page_url = node.url().to_string();
        let (text, inducing) = node.into_parts();

        let mut page = RewrittenPage::new();
        let mut links = 0;
        for item in LinkScanner::new(&text) {
            match item {
                ScanItem::Literal(literal) => page.push_literal(literal),
                ScanItem::Link(link) => {
                    links += 1;
                    self.rewrite_link(id, level, &page_url, link, &mut page);
                }
            }
        }
        tracing::debug!(
            "Scanned {}: {} links, {} awaiting resolution",
            page_url,
            links,
            page.unresolved_count()
        );

        if page.is_complete() {
            inducing.save_text(&mut self.storage, &page.assemble())?;
        } else {
            self.pending.insert(
                id,
                PendingPage {
                    url: page_url,
                    inducing,
                    page,
                },
            );
        }
        Ok(())
    }

    fn rewrite_link(
        &mut self,
        id: NodeId,
        level: u32,
        page_url: &str,
        link: &str,
        page: &mut RewrittenPage,
    ) {
        if !is_followable(link) {
            page.push_literal(link);
            return;
        }

        let (target, fragment) = split_fragment(link.trim());
        let absolute = match resolve(page_url, target) {
            Ok(absolute) => self.regulator.regulate(&absolute),
            Err(e) => {
                tracing::debug!("Leaving link as is: {}", e);
                page.push_literal(link);
                return;
            }
        };

        if let Some(actual) = self.pool.is_downloaded(&absolute) {
            let actual = actual.to_string();
            page.push_resolved(page_url, &actual, fragment);
            return;
        }

        if !self.pool.is_in_pool(&absolute) {
            let fetch_level = level + 1;
            if self.max_depth > 0 && fetch_level / 2 > self.max_depth {
                tracing::trace!("{} is beyond max depth {}", absolute, self.max_depth);
                page.push_literal(&absolute);
                if let Some(fragment) = fragment {
                    page.push_literal("#");
                    page.push_literal(fragment);
                }
                return;
            }

            let downloader = Downloader::new(absolute.clone(), fetch_level, Some(page_url.to_string()));
            self.scheduler
                .insert(GraphObject::Fetch(downloader), &self.connections);
            self.pool.register(&absolute);
        }

        match self.pool.subscribe(&absolute, id) {
            Subscription::Resolved(actual) => page.push_resolved(page_url, &actual, fragment),
            Subscription::Pending => page.push_placeholder(link, &absolute, fragment),
        }
    }

    /// Saves pages that never completed; returns how many there were
    fn flush_pending(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for page in pending.into_values() {
            tracing::warn!(
                "Saving {} with {} unresolved links",
                page.url,
                page.page.unresolved_count()
            );
            self.save_page(&page);
        }
        count
    }

    fn save_page(&mut self, pending: &PendingPage) {
        if let Err(e) = pending
            .inducing
            .save_text(&mut self.storage, &pending.page.assemble())
        {
            tracing::warn!("Failed to save {}: {}", pending.url, e);
            self.statistics
                .record_failure(ObjectKind::Parse, &pending.url, &e.to_string());
        }
    }
}
