use crate::graph::Downloader;
use serde::Serialize;
use std::fmt;

/// Identifies a page node for URL pool subscriptions
pub type NodeId = u64;

/// Kind of a graph object, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// A fetch action
    Fetch,
    /// A page parse node
    Parse,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Fetch => write!(f, "fetch"),
            ObjectKind::Parse => write!(f, "parse"),
        }
    }
}

/// A unit of work in the crawl graph
///
/// Levels are breadth-first depths: the seed fetch is level 0, the page it yields level 1, the
/// fetches for that page's links level 2, and so on. A level never changes after creation.
#[derive(Debug)]
pub enum GraphObject {
    Fetch(Downloader),
    Parse(PageNode),
}

impl GraphObject {
    pub fn level(&self) -> u32 {
        match self {
            GraphObject::Fetch(downloader) => downloader.level(),
            GraphObject::Parse(node) => node.level(),
        }
    }

    /// URL the object works on
    pub fn url(&self) -> Option<&str> {
        match self {
            GraphObject::Fetch(downloader) => Some(downloader.url()),
            GraphObject::Parse(node) => Some(node.url()),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            GraphObject::Fetch(_) => ObjectKind::Fetch,
            GraphObject::Parse(_) => ObjectKind::Parse,
        }
    }

    /// Page the object was discovered on; only fetches have one
    pub fn source_url(&self) -> Option<&str> {
        match self {
            GraphObject::Fetch(downloader) => downloader.source_url(),
            GraphObject::Parse(_) => None,
        }
    }
}

/// A fetched page waiting to have its links scanned and rewritten
///
/// The node keeps the downloader that fetched it: its actual URL is the node's URL and its
/// location is where the rewritten page is saved.
#[derive(Debug)]
pub struct PageNode {
    id: NodeId,
    level: u32,
    page: String,
    inducing: Downloader,
}

impl PageNode {
    pub fn new(id: NodeId, level: u32, page: String, inducing: Downloader) -> Self {
        Self {
            id,
            level,
            page,
            inducing,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Actual URL of the page
    pub fn url(&self) -> &str {
        self.inducing.actual_url()
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    /// The fetch that produced this page
    pub fn inducing(&self) -> &Downloader {
        &self.inducing
    }

    /// Splits the node into its page text and inducing downloader
    pub fn into_parts(self) -> (String, Downloader) {
        (self.page, self.inducing)
    }
}
