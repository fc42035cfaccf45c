use crate::connections::DEFAULT_MAX_AGENTS;
use serde::{Deserialize, Serialize};

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

/// What to mirror and where to put it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Page the crawl starts from
    #[serde(rename = "seed-url", skip_serializing_if = "Option::is_none")]
    pub seed_url: Option<String>,

    /// Directory the mirrored tree is written under
    #[serde(rename = "base-directory")]
    pub base_directory: String,

    /// Link hops followed from the seed (0 = unlimited)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Write each page's raw text before its links are rewritten
    #[serde(rename = "save-original-pages")]
    pub save_original_pages: bool,

    /// Send a `Referer` header naming the requested host
    #[serde(rename = "use-referrer")]
    pub use_referrer: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_url: None,
            base_directory: "./mirror".to_string(),
            max_depth: 0,
            save_original_pages: true,
            use_referrer: true,
        }
    }
}

/// Socket and retry behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum number of per-host agents kept alive
    #[serde(rename = "max-agents")]
    pub max_agents: usize,

    /// Plain connect timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Secure connect and handshake timeout (milliseconds)
    #[serde(rename = "secure-connect-timeout-ms")]
    pub secure_connect_timeout_ms: u64,

    /// Token/cookie exchange attempts before a fetch is given up
    #[serde(rename = "max-session-attempts")]
    pub max_session_attempts: u32,

    /// Ordinary redirect hops followed per fetch
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Local addresses to connect from, tried in turn
    #[serde(rename = "bind-addresses")]
    pub bind_addresses: Vec<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_agents: DEFAULT_MAX_AGENTS,
            connect_timeout_ms: 3000,
            secure_connect_timeout_ms: 3000,
            max_session_attempts: 5,
            max_redirects: 5,
            bind_addresses: Vec::new(),
        }
    }
}

/// Header values sent with every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("Mozilla/5.0 (compatible; sumi-mirror/{})", env!("CARGO_PKG_VERSION")),
            accept_language: "en-AU,en;q=0.8".to_string(),
        }
    }
}
