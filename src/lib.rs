//! Sumi-Mirror: a recursive site mirroring crawler
//!
//! This crate fetches a seed page over a hand-rolled HTTP/1.1 client, rewrites its links to point
//! at local copies, and keeps discovering and downloading linked resources breadth-first across
//! hosts, reusing a bounded set of per-host connections.

pub mod config;
pub mod connections;
pub mod graph;
pub mod http;
pub mod output;
pub mod pool;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Failed to resolve host name {host}")]
    NameResolution { host: String },

    #[error("Failed to connect to {host} (secure: {secure})")]
    ConnectFailed { host: String, secure: bool },

    #[error("Session exchange for {url} gave up after {attempts} attempts")]
    SessionExhausted { url: String, attempts: u32 },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Exchange with {url} failed")]
    ExchangeFailed { url: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by the HTTP protocol client
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed chunk length: {0:?}")]
    MalformedChunk(String),

    #[error("Malformed response header: {0}")]
    MalformedHeader(String),

    #[error("Failed to decompress body: {0}")]
    Decompression(std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Agent is not connected")]
    NotConnected,
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Cannot resolve {link} against {base}")]
    Unresolvable { base: String, link: String },
}

/// Result type alias for Sumi-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for HTTP client operations
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use graph::{mirror, CrawlObserver, Crawler, ProcessedEvent};
pub use http::{HostAgent, HttpResponse};
pub use output::CrawlSummary;
pub use url::{classify, resolve, to_file_path, url_distance, LinkKind};
