use crate::config::types::{Config, ConnectionConfig, CrawlConfig, RequestConfig};
use crate::ConfigError;
use std::net::IpAddr;
use url::Url;

/// Smallest accepted connect timeout (milliseconds)
const MIN_TIMEOUT_MS: u64 = 100;

/// Largest accepted agent bound
const MAX_AGENTS_LIMIT: usize = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_connection_config(&config.connection)?;
    validate_request_config(&config.request)?;
    Ok(())
}

/// Validates the crawl section
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if let Some(seed) = &config.seed_url {
        validate_seed_url(seed)?;
    }

    if config.base_directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "base_directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a seed URL is an absolute `http`/`https` URL with a host
pub fn validate_seed_url(seed: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(seed.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed_url '{}': {}", seed, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "seed_url must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "seed_url has no host: '{}'",
            seed
        )));
    }

    Ok(())
}

/// Validates the connection section
fn validate_connection_config(config: &ConnectionConfig) -> Result<(), ConfigError> {
    if config.max_agents < 1 || config.max_agents > MAX_AGENTS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_agents must be between 1 and {}, got {}",
            MAX_AGENTS_LIMIT, config.max_agents
        )));
    }

    if config.connect_timeout_ms < MIN_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_ms must be >= {}ms, got {}ms",
            MIN_TIMEOUT_MS, config.connect_timeout_ms
        )));
    }

    if config.secure_connect_timeout_ms < MIN_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "secure_connect_timeout_ms must be >= {}ms, got {}ms",
            MIN_TIMEOUT_MS, config.secure_connect_timeout_ms
        )));
    }

    if config.max_session_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_session_attempts must be >= 1, got {}",
            config.max_session_attempts
        )));
    }

    for address in &config.bind_addresses {
        address.parse::<IpAddr>().map_err(|_| {
            ConfigError::Validation(format!("bind address '{}' is not an IP address", address))
        })?;
    }

    Ok(())
}

/// Validates the request section
fn validate_request_config(config: &RequestConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    // Header values end at the line break
    if config.user_agent.contains(['\r', '\n']) || config.accept_language.contains(['\r', '\n'])
    {
        return Err(ConfigError::Validation(
            "request header values cannot contain line breaks".to_string(),
        ));
    }

    Ok(())
}
