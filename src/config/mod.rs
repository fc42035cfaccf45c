//! Configuration module for Sumi-Mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files, and turning a
//! loaded configuration into the settings the crawl components take.
//!
//! # Example
//!
//! ```no_run
//! use sumi_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Keeping at most {} connections", config.connection.max_agents);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, ConnectionConfig, CrawlConfig, RequestConfig};

pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_seed_url};

use crate::http::{ConnectOptions, RequestHeaders};
use std::net::IpAddr;
use std::time::Duration;

impl ConnectionConfig {
    /// Socket options for every agent of a crawl
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            secure_connect_timeout: Duration::from_millis(self.secure_connect_timeout_ms),
            bind_addresses: self
                .bind_addresses
                .iter()
                .filter_map(|a| a.parse::<IpAddr>().ok())
                .collect(),
        }
    }
}

impl RequestConfig {
    /// Header values for every request of a crawl
    pub fn headers(&self) -> RequestHeaders {
        RequestHeaders {
            user_agent: self.user_agent.clone(),
            accept_language: self.accept_language.clone(),
        }
    }
}
