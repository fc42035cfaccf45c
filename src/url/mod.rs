//! URL handling module for Sumi-Mirror
//!
//! This module provides the string-level URL helpers the crawler is built on: link
//! classification, resolution against a base page, host/path splitting, the URL to local file
//! mapping, the host-affinity distance used by the scheduler, and host name regulation.
//!
//! Everything here works on plain strings. Links scraped from pages are frequently malformed, and
//! the crawler has to keep going with whatever it can make of them.

mod distance;
mod file_path;
mod regulator;
mod resolve;

pub use distance::{compare_url_distances, url_distance, MAX_DISTANCE};
pub use file_path::{file_relative, sanitize_file_name, to_file_path, FilePath};
pub use regulator::HostRegulator;
pub use resolve::{is_followable, resolve, split_fragment};

/// Scheme prefix of plain-text URLs
pub const HTTP: &str = "http://";

/// Scheme prefix of secure URLs
pub const HTTPS: &str = "https://";

/// File name used when a URL has no last path segment
pub const DEFAULT_FILE_NAME: &str = "index.html";

/// Separator between directory segments of a [`FilePath`]
pub const DIRECTORY_SEPARATOR: char = '/';

/// How a link relates to the page it appears on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Starts with `http://` or `https://`
    Absolute,
    /// Starts with `/`, resolved against the host of the base page
    RootBased,
    /// Anything else, resolved against the directory of the base page
    Relative,
}

/// Classifies a link by its prefix
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::{classify, LinkKind};
///
/// assert_eq!(classify("https://example.com/a"), LinkKind::Absolute);
/// assert_eq!(classify("/img/logo.png"), LinkKind::RootBased);
/// assert_eq!(classify("../style.css"), LinkKind::Relative);
/// ```
pub fn classify(link: &str) -> LinkKind {
    if link.starts_with('.') {
        return LinkKind::Relative;
    }
    if link.starts_with('/') {
        return LinkKind::RootBased;
    }
    if starts_with_ignore_case(link, HTTP) || starts_with_ignore_case(link, HTTPS) {
        return LinkKind::Absolute;
    }
    LinkKind::Relative
}

/// Returns true if the URL uses the `https` scheme
pub fn is_https(url: &str) -> bool {
    starts_with_ignore_case(url, HTTPS)
}

/// A URL split into its scheme prefix, host and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAndPath {
    /// `http://` or `https://` (`http://` when the URL carried no prefix)
    pub prefix: &'static str,
    /// Lowercased host, including an explicit `:port` if present
    pub host: String,
    /// Everything from the first `/` after the host, or empty
    pub path: String,
}

impl HostAndPath {
    /// Returns true if the prefix is `https://`
    pub fn is_secure(&self) -> bool {
        self.prefix == HTTPS
    }

    /// Returns the path to put on a request line (never empty)
    pub fn request_path(&self) -> &str {
        if self.path.is_empty() {
            "/"
        } else {
            &self.path
        }
    }
}

/// Splits a URL into prefix, host and path
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::to_host_and_path;
///
/// let split = to_host_and_path("http://Example.com/a/b.html");
/// assert_eq!(split.prefix, "http://");
/// assert_eq!(split.host, "example.com");
/// assert_eq!(split.path, "/a/b.html");
/// ```
pub fn to_host_and_path(url: &str) -> HostAndPath {
    let url = url.trim();
    let (prefix, rest) = strip_prefix(url);
    let (host, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, ""),
    };

    HostAndPath {
        prefix: prefix.unwrap_or(HTTP),
        host: host.to_lowercase(),
        path: path.to_string(),
    }
}

/// Returns the lowercased host of a URL
pub fn host_of(url: &str) -> String {
    to_host_and_path(url).host
}

/// Splits a URL or path into its `/`-separated segments
///
/// Empty segments are skipped except for the last one, which is always returned so that a
/// trailing slash shows up as a trailing empty segment. Once a `?` or `&` has been seen the rest
/// of the string belongs to the last segment.
pub fn split_segments(url: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (i, c) in url.char_indices() {
        if c == '?' || c == '&' {
            break;
        }
        if c == '/' {
            if i > start {
                segments.push(&url[start..i]);
            }
            start = i + 1;
        }
    }
    segments.push(&url[start..]);
    segments
}

/// Strips an `http://` or `https://` prefix (case-insensitive)
pub(crate) fn strip_prefix(url: &str) -> (Option<&'static str>, &str) {
    if starts_with_ignore_case(url, HTTP) {
        (Some(HTTP), &url[HTTP.len()..])
    } else if starts_with_ignore_case(url, HTTPS) {
        (Some(HTTPS), &url[HTTPS.len()..])
    } else {
        (None, url)
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
