use crate::http::{ConnectOptions, HostAgent, TlsConnectorCache};
use std::collections::{BTreeMap, HashMap};

/// Default bound on live agents
pub const DEFAULT_MAX_AGENTS: usize = 64;

/// Answers whether a host already has a live agent
///
/// The scheduler uses this to put work for hosts with an open connection first.
pub trait HostAffinity {
    fn has_connection(&self, host: &str) -> bool;
}

/// Bounded map from host name to [`HostAgent`], evicted least-recently-used
///
/// Eviction only happens when a new host arrives at a full cache. An evicted agent is
/// simply dropped; work queued for its host reconnects through a fresh agent on next use.
pub struct ConnectionCache {
    agents: HashMap<String, CacheEntry>,
    /// Last-use tick to host, oldest first
    order: BTreeMap<u64, String>,
    tick: u64,
    max_agents: usize,
    options: ConnectOptions,
    tls: TlsConnectorCache,
}

struct CacheEntry {
    agent: HostAgent,
    last_used: u64,
}

impl ConnectionCache {
    /// Creates an empty cache holding at most `max_agents` agents
    pub fn new(max_agents: usize, options: ConnectOptions) -> Self {
        Self {
            agents: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
            max_agents: max_agents.max(1),
            options,
            tls: TlsConnectorCache::new(),
        }
    }

    /// Returns the agent for `host`, creating it if needed
    ///
    /// A cached agent is promoted to most recently used. Creating a new agent when the cache is
    /// full evicts the least recently used one first.
    ///
    /// # Arguments
    ///
    /// * `host` - Lowercased host name, optionally with `:port`
    pub fn get_or_create(&mut self, host: &str) -> &mut HostAgent {
        self.tick += 1;
        let tick = self.tick;

        if !self.agents.contains_key(host) {
            self.make_room();
            tracing::debug!("Creating agent for {}", host);
        }

        let entry = self
            .agents
            .entry(host.to_string())
            .or_insert_with(|| CacheEntry {
                agent: HostAgent::new(host, self.options.clone(), self.tls.clone()),
                last_used: tick,
            });
        self.order.remove(&entry.last_used);
        entry.last_used = tick;
        self.order.insert(tick, host.to_string());
        &mut entry.agent
    }

    /// Returns true if `host` has a cached agent (does not promote it)
    pub fn contains(&self, host: &str) -> bool {
        self.agents.contains_key(host)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn make_room(&mut self) {
        while self.agents.len() >= self.max_agents {
            let Some((_, host)) = self.order.pop_first() else {
                break;
            };
            tracing::debug!("Evicting agent for {}", host);
            self.agents.remove(&host);
        }
    }
}

impl HostAffinity for ConnectionCache {
    fn has_connection(&self, host: &str) -> bool {
        self.contains(host)
    }
}
