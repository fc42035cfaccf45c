//! Literal GET request construction
//!
//! Requests are assembled as plain text with a fixed header order; the agent writes the bytes to
//! the socket as they are.

use crate::url::HostAndPath;

/// Line terminator for request and response header lines
pub const CRLF: &str = "\r\n";

/// Value of the `Accept` header on every request
pub const ACCEPT: &str = "text/html, application/xhtml+xml, */*";

/// Value of the `Accept-Encoding` header on every request
pub const ACCEPT_ENCODING: &str = "gzip, deflate";

/// Header values that stay the same across a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    pub user_agent: String,
    pub accept_language: String,
}

/// Builder for a single GET request
#[derive(Debug, Clone)]
pub struct GetRequest<'a> {
    target: &'a HostAndPath,
    path: Option<String>,
    referrer: bool,
    cookie: Option<String>,
}

impl<'a> GetRequest<'a> {
    /// Starts a request for the path of `target`
    pub fn new(target: &'a HostAndPath) -> Self {
        Self {
            target,
            path: None,
            referrer: false,
            cookie: None,
        }
    }

    /// Requests `path` on the target host instead of the target's own path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a `Referer` header naming the target's scheme and host
    pub fn with_referrer(mut self, referrer: bool) -> Self {
        self.referrer = referrer;
        self
    }

    /// Adds a `Cookie` header
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Renders the request text, terminated by an empty line
    pub fn render(&self, headers: &RequestHeaders) -> String {
        let path = self
            .path
            .as_deref()
            .unwrap_or_else(|| self.target.request_path());

        let mut text = String::with_capacity(512);
        push_line(&mut text, &format!("GET {} HTTP/1.1", path));
        push_line(&mut text, &format!("Accept: {}", ACCEPT));
        if self.referrer {
            push_line(
                &mut text,
                &format!("Referer: {}{}/", self.target.prefix, self.target.host),
            );
        }
        push_line(
            &mut text,
            &format!("Accept-Language: {}", headers.accept_language),
        );
        push_line(&mut text, &format!("User-Agent: {}", headers.user_agent));
        push_line(&mut text, &format!("Accept-Encoding: {}", ACCEPT_ENCODING));
        push_line(&mut text, &format!("Host: {}", self.target.host));
        push_line(&mut text, "DNT: 1");
        push_line(&mut text, "Connection: keep-alive");
        if let Some(cookie) = &self.cookie {
            push_line(&mut text, &format!("Cookie: {}", cookie));
        }
        text.push_str(CRLF);
        text
    }
}

fn push_line(text: &mut String, line: &str) {
    text.push_str(line);
    text.push_str(CRLF);
}
