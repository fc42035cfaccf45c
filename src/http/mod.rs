//! Hand-rolled HTTP/1.1 client
//!
//! This module contains:
//! - Literal GET request construction with a fixed header order
//! - Response parsing straight off the socket (chunked, `Content-Length`, session responses)
//! - The per-host [`HostAgent`] that owns the socket, plain or TLS

mod agent;
mod request;
mod response;

pub use agent::{
    is_transient, split_port, AgentState, BoxedTransport, ConnectOptions, HostAgent, Transport,
    HTTPS_PORT, HTTP_PORT,
};
pub use request::{GetRequest, RequestHeaders, ACCEPT, ACCEPT_ENCODING, CRLF};
pub use response::{
    decode_content, decode_text, parse_header_block, read_chunked_body, read_header_block,
    read_response, HttpResponse, ResponseBody, HEADER_TERMINATOR,
};

use crate::{HttpError, HttpResult};
use std::sync::{Arc, OnceLock};
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

/// Lazily built TLS connector shared by every agent of a crawl
///
/// The client configuration trusts the bundled web PKI roots. It is built on first use so crawls
/// that never leave plain HTTP do not pay for it.
#[derive(Clone, Default)]
pub struct TlsConnectorCache {
    inner: Arc<OnceLock<Result<TlsConnector, String>>>,
}

impl TlsConnectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared connector, building it on first call
    pub fn connector(&self) -> HttpResult<TlsConnector> {
        match self.inner.get_or_init(build_connector) {
            Ok(connector) => Ok(connector.clone()),
            Err(message) => Err(HttpError::Tls(message.clone())),
        }
    }
}

fn build_connector() -> Result<TlsConnector, String> {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| e.to_string())?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}
