//! Scheduler for ordering the crawl graph's work queue
//!
//! This module handles:
//! - Breadth-first ordering by level
//! - Preferring work that stays on the seed's host
//! - Host-affinity distance from the seed URL
//! - Preferring hosts that already have a live connection

use crate::connections::HostAffinity;
use crate::graph::GraphObject;
use crate::url::{host_of, url_distance};
use std::collections::BTreeMap;

/// Priority of a queued object; lower sorts (and pops) first
///
/// Fields compare in declaration order. `seq` is unique, so two objects never share a key and
/// ties fall back to insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduleKey {
    /// Breadth-first depth
    level: u32,
    /// Fetch that neither targets the seed host nor was found on a seed-host page
    off_seed_host: bool,
    /// Objects without a URL go first
    has_url: bool,
    /// Distance indicator from the seed URL
    distance: u32,
    /// Target host differs from the seed host
    not_start_host: bool,
    /// Target host had no cached connection when the object was queued
    not_cached: bool,
    seq: u64,
}

/// Ordered queue of fetch and parse objects
///
/// Keys are computed once, at insert. Connection state that changes later (a host gaining or
/// losing its agent) does not reorder objects already queued.
#[derive(Debug)]
pub struct Scheduler {
    queue: BTreeMap<ScheduleKey, GraphObject>,
    seed_url: String,
    start_host: String,
    seq: u64,
}

impl Scheduler {
    /// Creates an empty scheduler for a crawl starting at `seed_url`
    pub fn new(seed_url: impl Into<String>) -> Self {
        let seed_url = seed_url.into();
        let start_host = host_of(&seed_url);
        Self {
            queue: BTreeMap::new(),
            seed_url,
            start_host,
            seq: 0,
        }
    }

    pub fn seed_url(&self) -> &str {
        &self.seed_url
    }

    pub fn start_host(&self) -> &str {
        &self.start_host
    }

    /// Queues an object
    ///
    /// # Arguments
    ///
    /// * `object` - The fetch or parse object
    /// * `affinity` - Which hosts currently have a live connection
    pub fn insert(&mut self, object: GraphObject, affinity: &impl HostAffinity) {
        let key = self.key_for(&object, affinity);
        tracing::trace!("Queueing {} {:?} as {:?}", object.kind(), object.url(), key);
        self.queue.insert(key, object);
    }

    /// Removes and returns the highest-priority object
    pub fn pop_min(&mut self) -> Option<GraphObject> {
        self.queue.pop_first().map(|(_, object)| object)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Iterates queued objects in pop order
    pub fn iter(&self) -> impl Iterator<Item = &GraphObject> {
        self.queue.values()
    }

    fn key_for(&mut self, object: &GraphObject, affinity: &impl HostAffinity) -> ScheduleKey {
        self.seq += 1;
        let host = object.url().map(host_of);

        let off_seed_host = match object {
            GraphObject::Fetch(_) => {
                let on_host = host.as_deref() == Some(self.start_host.as_str());
                let from_host = object
                    .source_url()
                    .map(|source| host_of(source) == self.start_host)
                    .unwrap_or(false);
                !(on_host || from_host)
            }
            GraphObject::Parse(_) => false,
        };

        let (distance, not_start_host, not_cached) = match (object.url(), &host) {
            (Some(url), Some(host)) => (
                url_distance(&self.seed_url, url),
                *host != self.start_host,
                !affinity.has_connection(host),
            ),
            _ => (0, false, false),
        };

        ScheduleKey {
            level: object.level(),
            off_seed_host,
            has_url: object.url().is_some(),
            distance,
            not_start_host,
            not_cached,
            seq: self.seq,
        }
    }
}
