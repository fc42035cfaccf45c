use std::collections::HashMap;

/// Outcome of subscribing to a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// The link already resolved; no notification will follow
    Resolved(String),
    /// The subscriber will be notified once the link resolves
    Pending,
}

/// Dedup ledger of every link seen during a crawl, plus actual-URL resolution
///
/// Keys are links trimmed and lowercased. A link is either resolved (its actual URL is known) or
/// pending (registered, possibly with subscribers waiting for the resolution). Resolutions are
/// never overwritten and entries are never removed.
///
/// `S` identifies a subscriber; the crawl session uses page node ids.
#[derive(Debug)]
pub struct UrlPool<S> {
    downloaded: HashMap<String, String>,
    pending: HashMap<String, Vec<S>>,
}

impl<S> Default for UrlPool<S> {
    fn default() -> Self {
        Self {
            downloaded: HashMap::new(),
            pending: HashMap::new(),
        }
    }
}

/// Returns the dedup key of a link
pub fn pool_key(link: &str) -> String {
    link.trim().to_lowercase()
}

impl<S: PartialEq> UrlPool<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the link is resolved or pending
    pub fn is_in_pool(&self, link: &str) -> bool {
        let key = pool_key(link);
        self.downloaded.contains_key(&key) || self.pending.contains_key(&key)
    }

    /// Returns the actual URL of a resolved link
    pub fn is_downloaded(&self, link: &str) -> Option<&str> {
        self.downloaded.get(&pool_key(link)).map(String::as_str)
    }

    /// Tracks a link as pending without a subscriber
    pub fn register(&mut self, link: &str) {
        let key = pool_key(link);
        if !self.downloaded.contains_key(&key) {
            self.pending.entry(key).or_default();
        }
    }

    /// Asks to be notified when `link` resolves
    ///
    /// A link with no registration is tracked implicitly. Subscribing twice with the same
    /// subscriber still yields a single notification, and subscribing after resolution returns
    /// the resolution directly.
    pub fn subscribe(&mut self, link: &str, subscriber: S) -> Subscription {
        let key = pool_key(link);
        if let Some(actual) = self.downloaded.get(&key) {
            return Subscription::Resolved(actual.clone());
        }

        let subscribers = self.pending.entry(key).or_default();
        if !subscribers.contains(&subscriber) {
            subscribers.push(subscriber);
        }
        Subscription::Pending
    }

    /// Records the actual URL of `original` and notifies its subscribers
    ///
    /// Every pending subscriber is passed to `notify` exactly once, in subscription order, and the
    /// pending set is cleared. A second resolution of the same link keeps the first one.
    ///
    /// # Arguments
    ///
    /// * `source` - URL of the fetch that produced the resolution
    /// * `original` - The link as it was registered
    /// * `actual` - Where the link ended up after redirects
    /// * `notify` - Called with each subscriber and the recorded actual URL
    pub fn set_actual_url<F>(&mut self, source: &str, original: &str, actual: &str, mut notify: F)
    where
        F: FnMut(S, &str),
    {
        let key = pool_key(original);
        let recorded = self
            .downloaded
            .entry(key.clone())
            .or_insert_with(|| actual.to_string())
            .as_str();
        if recorded != actual {
            tracing::debug!(
                "Keeping earlier resolution {} for {} (fetched by {})",
                recorded,
                original,
                source
            );
        }

        if let Some(subscribers) = self.pending.remove(&key) {
            tracing::trace!(
                "Resolved {} -> {}, notifying {} subscribers",
                original,
                recorded,
                subscribers.len()
            );
            for subscriber in subscribers {
                notify(subscriber, recorded);
            }
        }
    }

    /// Number of distinct links seen
    pub fn len(&self) -> usize {
        self.downloaded.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of links still awaiting resolution
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_then_resolve_notifies_once() {
        let mut pool: UrlPool<u32> = UrlPool::new();
        assert_eq!(pool.subscribe("http://x.com/a", 1), Subscription::Pending);
        assert_eq!(pool.subscribe("http://x.com/a", 1), Subscription::Pending);

        let mut notified = Vec::new();
        pool.set_actual_url("http://x.com/a", "http://x.com/a", "http://x.com/b", |s, url| {
            notified.push((s, url.to_string()))
        });
        assert_eq!(notified, vec![(1, "http://x.com/b".to_string())]);

        // Resolving again notifies nobody and keeps the first mapping
        let mut again = Vec::new();
        pool.set_actual_url("http://x.com/a", "http://x.com/a", "http://x.com/c", |s, _| {
            again.push(s)
        });
        assert!(again.is_empty());
        assert_eq!(pool.is_downloaded("http://x.com/a"), Some("http://x.com/b"));
    }

    #[test]
    fn test_subscribe_after_resolution_is_immediate() {
        let mut pool: UrlPool<u32> = UrlPool::new();
        pool.register("http://x.com/a");
        pool.set_actual_url("", "http://x.com/a", "https://x.com/a", |_, _| {
            panic!("no subscribers")
        });
        assert_eq!(
            pool.subscribe("http://x.com/a", 7),
            Subscription::Resolved("https://x.com/a".to_string())
        );
        assert_eq!(pool.pending_count(), 0);
    }

    #[test]
    fn test_multiple_subscribers_in_order() {
        let mut pool: UrlPool<u32> = UrlPool::new();
        pool.subscribe("http://x.com/a", 3);
        pool.subscribe("http://x.com/a", 1);
        pool.subscribe("http://x.com/a", 2);

        let mut notified = Vec::new();
        pool.set_actual_url("", "http://x.com/a", "http://x.com/a", |s, _| notified.push(s));
        assert_eq!(notified, vec![3, 1, 2]);
    }

    #[test]
    fn test_dedup_ignores_case_and_whitespace() {
        let mut pool: UrlPool<u32> = UrlPool::new();
        pool.register("http://X.com/Page.html");
        pool.register("  http://x.com/page.html \n");
        assert_eq!(pool.len(), 1);
        assert!(pool.is_in_pool("HTTP://x.COM/page.html"));
    }

    #[test]
    fn test_unknown_link() {
        let pool: UrlPool<u32> = UrlPool::new();
        assert!(!pool.is_in_pool("http://x.com/"));
        assert!(pool.is_downloaded("http://x.com/").is_none());
        assert!(pool.is_empty());
    }
}
