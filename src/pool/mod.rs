//! URL pool module
//!
//! Dedups every link a crawl discovers and lets page nodes learn where a link finally lives once
//! its downloader has followed redirects.

mod url_pool;

pub use url_pool::{pool_key, Subscription, UrlPool};
