use crate::url::to_host_and_path;
use std::collections::HashSet;

/// Unifies `www.`-prefixed and bare host names
///
/// The first spelling of a host the regulator sees wins: later URLs using the other spelling are
/// rewritten to it, so `http://www.x.com/a` and `http://x.com/a` end up as one pool entry and one
/// local directory.
#[derive(Debug, Default)]
pub struct HostRegulator {
    hosts: HashSet<String>,
}

impl HostRegulator {
    /// Creates an empty regulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `url` with its host replaced by the previously seen spelling, if any
    pub fn regulate(&mut self, url: &str) -> String {
        let split = to_host_and_path(url);
        if split.host.is_empty() || self.hosts.contains(&split.host) {
            return url.to_string();
        }

        let alternative = match split.host.strip_prefix("www.") {
            Some(bare) => bare.to_string(),
            None => format!("www.{}", split.host),
        };

        if self.hosts.contains(&alternative) {
            tracing::trace!("Regulating host {} to {}", split.host, alternative);
            format!("{}{}{}", split.prefix, alternative, split.path)
        } else {
            self.hosts.insert(split.host);
            url.to_string()
        }
    }

    /// Returns the number of distinct hosts seen
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if no host has been seen yet
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
