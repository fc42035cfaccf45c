//! Fetch action
//!
//! A [`Downloader`] fetches one URL through the connection cache: plain first (or secure for
//! `https` links), upgrading to secure when the server points there, following ordinary
//! redirects, and working through the token/cookie session exchange some sites gate pages
//! behind.

use crate::connections::ConnectionCache;
use crate::http::{GetRequest, HostAgent, HttpResponse, RequestHeaders, ResponseBody};
use crate::storage::{self, Storage};
use crate::url::{resolve, to_file_path, to_host_and_path, FilePath, HostAndPath};
use crate::MirrorError;

/// Times an exchange is repeated after the agent recovered from a dropped connection
const EXCHANGE_ATTEMPTS: u32 = 2;

/// Cookie sent along with the session token
const TEST_COOKIE: &str = "test=1";

/// Cookie carrying the session value
const SESSION_COOKIE: &str = "slave=";

/// Request settings shared by every fetch of a crawl
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub headers: RequestHeaders,
    pub use_referrer: bool,
    pub max_session_attempts: u32,
    pub max_redirects: u32,
}

/// What a successful fetch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedContent {
    Page(String),
    Data(Vec<u8>),
}

/// Fetch action for one discovered URL
#[derive(Debug, Clone)]
pub struct Downloader {
    url: String,
    actual_url: Option<String>,
    level: u32,
    source_url: Option<String>,
}

impl Downloader {
    /// Creates a fetch for `url`, discovered on `source_url` (`None` for the seed)
    pub fn new(url: impl Into<String>, level: u32, source_url: Option<String>) -> Self {
        Self {
            url: url.into(),
            actual_url: None,
            level,
            source_url,
        }
    }

    /// URL as discovered
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL after redirects; the discovered URL until a response says otherwise
    pub fn actual_url(&self) -> &str {
        self.actual_url.as_deref().unwrap_or(&self.url)
    }

    pub fn set_actual_url(&mut self, url: impl Into<String>) {
        self.actual_url = Some(url.into());
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Where the fetched content is stored, derived from the actual URL
    pub fn location(&self) -> FilePath {
        to_file_path(self.actual_url())
    }

    /// Stores page text at this fetch's location
    pub fn save_text<S: Storage>(&self, storage: &mut S, text: &str) -> crate::Result<()> {
        storage::save_text(storage, &self.location(), text)?;
        Ok(())
    }

    /// Stores raw bytes at this fetch's location
    pub fn save_bytes<S: Storage>(&self, storage: &mut S, bytes: &[u8]) -> crate::Result<()> {
        storage::save_bytes(storage, &self.location(), bytes)?;
        Ok(())
    }

    /// Fetches the URL
    ///
    /// The actual URL is updated as redirects are followed, also when the fetch fails part way.
    ///
    /// # Errors
    ///
    /// * `MirrorError::NameResolution` / `ConnectFailed` - the host could not be reached
    /// * `MirrorError::RedirectLimit` - too many redirects
    /// * `MirrorError::SessionExhausted` - the session exchange did not produce the page
    /// * `MirrorError::Http` - a fatal socket or protocol error
    pub async fn perform(
        &mut self,
        connections: &mut ConnectionCache,
        settings: &FetchSettings,
    ) -> crate::Result<FetchedContent> {
        let mut redirects = 0;
        loop {
            let current = self.actual_url().to_string();
            let target = to_host_and_path(&current);
            let agent = connections.get_or_create(&target.host);
            let secure = open_connection(agent, target.is_secure()).await?;

            let request = GetRequest::new(&target)
                .with_referrer(settings.use_referrer)
                .render(&settings.headers);
            let response = exchange(agent, &request, &current).await?;
            tracing::debug!(
                "{} -> status {:?}, {} body",
                current,
                response.status,
                body_kind(&response.body)
            );

            let location = match response.location.as_deref().map(str::trim) {
                Some(location) if !location.is_empty() => Some(resolve(&current, location)?),
                _ => None,
            };

            if let Some(location) = &location {
                if !secure && response.redirects_to_secure() {
                    tracing::debug!("{} moved to secure {}", current, location);
                    self.follow(location, &mut redirects, settings)?;
                    continue;
                }
            }

            if response.is_session() && is_session_challenge(&response) {
                let response =
                    session_exchange(agent, &target, response, settings, &current).await?;
                return into_content(response, &current, settings.max_session_attempts);
            }

            if let Some(location) = &location {
                let redirect_status = response.status.map(|s| (300..400).contains(&s));
                if response.is_session() || redirect_status == Some(true) {
                    tracing::debug!("{} redirected to {}", current, location);
                    self.follow(location, &mut redirects, settings)?;
                    continue;
                }
            }

            return match response.body {
                ResponseBody::Page(text) => Ok(FetchedContent::Page(text)),
                ResponseBody::Data(bytes) => Ok(FetchedContent::Data(bytes)),
                ResponseBody::Session => Ok(FetchedContent::Data(Vec::new())),
            };
        }
    }

    fn follow(
        &mut self,
        location: &str,
        redirects: &mut u32,
        settings: &FetchSettings,
    ) -> crate::Result<()> {
        *redirects += 1;
        if *redirects > settings.max_redirects {
            return Err(MirrorError::RedirectLimit {
                url: self.url.clone(),
            });
        }
        self.actual_url = Some(location.to_string());
        Ok(())
    }
}

/// Connects the agent, falling back from plain to secure
///
/// Returns whether the connection is secure.
async fn open_connection(agent: &mut HostAgent, secure: bool) -> crate::Result<bool> {
    if secure {
        if agent.ensure_connected(true).await? {
            return Ok(true);
        }
    } else {
        // A host that only answered securely before keeps its secure connection
        if agent.is_connected(true) {
            return Ok(true);
        }
        if agent.ensure_connected(false).await? {
            return Ok(false);
        }
        tracing::debug!("Plain connect to {} failed, trying secure", agent.host());
        if agent.ensure_connected(true).await? {
            return Ok(true);
        }
    }

    Err(MirrorError::ConnectFailed {
        host: agent.host().to_string(),
        secure: true,
    })
}

/// Sends a request and reads its response, repeating once if the agent had to reconnect
async fn exchange(agent: &mut HostAgent, request: &str, url: &str) -> crate::Result<HttpResponse> {
    for attempt in 1..=EXCHANGE_ATTEMPTS {
        agent.send_request(request).await?;
        if let Some(response) = agent.get_response().await? {
            return Ok(response);
        }
        tracing::debug!("Exchange {} with {} interrupted", attempt, url);
    }
    Err(MirrorError::ExchangeFailed {
        url: url.to_string(),
    })
}

/// Works through the token/cookie exchange and returns the response to the original request
///
/// Each attempt requests `/?responseToken=<token>` with the token taken from the challenge's
/// `Location`, then re-requests the original path with the `slave` cookie the server set.
async fn session_exchange(
    agent: &mut HostAgent,
    target: &HostAndPath,
    challenge: HttpResponse,
    settings: &FetchSettings,
    url: &str,
) -> crate::Result<HttpResponse> {
    let mut response = challenge;
    for attempt in 1..=settings.max_session_attempts {
        let token = token_from_location(response.location.as_deref().unwrap_or_default());
        tracing::debug!("Session attempt {} for {} with token {:?}", attempt, url, token);

        let token_request = GetRequest::new(target)
            .with_path(format!("/?responseToken={}", token))
            .with_cookie(TEST_COOKIE)
            .render(&settings.headers);
        response = exchange(agent, &token_request, url).await?;

        match session_cookie(response.set_cookie.as_deref()) {
            Some(cookie) => {
                let page_request = GetRequest::new(target)
                    .with_referrer(settings.use_referrer)
                    .with_cookie(format!("{}; {}{}", TEST_COOKIE, SESSION_COOKIE, cookie))
                    .render(&settings.headers);
                return exchange(agent, &page_request, url).await;
            }
            None if response.is_session() => continue,
            None => break,
        }
    }

    Err(MirrorError::SessionExhausted {
        url: url.to_string(),
        attempts: settings.max_session_attempts,
    })
}

fn into_content(
    response: HttpResponse,
    url: &str,
    attempts: u32,
) -> crate::Result<FetchedContent> {
    match response.body {
        ResponseBody::Page(text) => Ok(FetchedContent::Page(text)),
        ResponseBody::Data(bytes) => Ok(FetchedContent::Data(bytes)),
        ResponseBody::Session => Err(MirrorError::SessionExhausted {
            url: url.to_string(),
            attempts,
        }),
    }
}

/// Returns true for bodiless responses that start a token/cookie exchange rather than redirect
fn is_session_challenge(response: &HttpResponse) -> bool {
    response.set_cookie.is_some()
        || response
            .location
            .as_deref()
            .map(|location| location.contains('='))
            .unwrap_or(false)
}

/// Returns the text after the last `=` of a challenge location
pub fn token_from_location(location: &str) -> &str {
    match location.rfind('=') {
        Some(eq) => &location[eq + 1..],
        None => "",
    }
}

/// Returns the `slave` cookie value from a `Set-Cookie` header
pub fn session_cookie(set_cookie: Option<&str>) -> Option<&str> {
    let set_cookie = set_cookie?;
    let start = set_cookie.find(SESSION_COOKIE)? + SESSION_COOKIE.len();
    let rest = &set_cookie[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn body_kind(body: &ResponseBody) -> &'static str {
    match body {
        ResponseBody::Page(_) => "page",
        ResponseBody::Data(_) => "data",
        ResponseBody::Session => "no",
    }
}
