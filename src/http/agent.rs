//! Per-host connection agent
//!
//! A [`HostAgent`] owns one socket to one host and moves through
//! `Disconnected -> Connected -> (Sending <-> Connected) -> (Receiving <-> Connected)`.
//! It is driven by a single caller at a time.

use crate::http::response::read_response;
use crate::http::{HttpResponse, TlsConnectorCache};
use crate::{HttpError, HttpResult, MirrorError};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::{TcpSocket, TcpStream};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;

/// Default port for plain connections
pub const HTTP_PORT: u16 = 80;

/// Default port for secure connections
pub const HTTPS_PORT: u16 = 443;

/// Number of times a request is written before a send failure is reported
const SEND_ATTEMPTS: u32 = 2;

/// Byte stream an agent talks over: a TCP socket or a TLS session on top of one
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + Sync {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Sync> Transport for T {}

/// Owned, type-erased transport
pub type BoxedTransport = Box<dyn Transport>;

/// Connection state of a [`HostAgent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Disconnected,
    Connected,
    Sending,
    Receiving,
}

/// Connection parameters shared by every agent of a crawl
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub secure_connect_timeout: Duration,
    /// Local addresses tried in turn; empty means the OS picks
    pub bind_addresses: Vec<IpAddr>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            secure_connect_timeout: Duration::from_millis(3000),
            bind_addresses: Vec::new(),
        }
    }
}

/// One live connection to one host
pub struct HostAgent {
    host: String,
    options: ConnectOptions,
    tls: TlsConnectorCache,
    state: AgentState,
    secure: bool,
    reader: Option<BufReader<ReadHalf<BoxedTransport>>>,
    writer: Option<WriteHalf<BoxedTransport>>,
}

impl std::fmt::Debug for HostAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostAgent")
            .field("host", &self.host)
            .field("state", &self.state)
            .field("secure", &self.secure)
            .finish()
    }
}

impl HostAgent {
    /// Creates a disconnected agent for `host` (which may carry an explicit `:port`)
    pub fn new(host: impl Into<String>, options: ConnectOptions, tls: TlsConnectorCache) -> Self {
        Self {
            host: host.into(),
            options,
            tls,
            state: AgentState::Disconnected,
            secure: false,
            reader: None,
            writer: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Returns true if the agent holds a connection of the given kind
    pub fn is_connected(&self, secure: bool) -> bool {
        self.state != AgentState::Disconnected && self.secure == secure
    }

    /// Connects unless a connection of the requested kind is already open
    pub async fn ensure_connected(&mut self, secure: bool) -> crate::Result<bool> {
        if self.is_connected(secure) {
            return Ok(true);
        }
        self.connect(secure).await
    }

    /// Opens a fresh connection, plain or secure
    ///
    /// Every candidate local adapter is tried against every resolved address of the host, each
    /// attempt racing a timer. Returns `Ok(false)` if nothing connected.
    ///
    /// # Errors
    ///
    /// * `MirrorError::NameResolution` - the host name did not resolve; not worth retrying
    pub async fn connect(&mut self, secure: bool) -> crate::Result<bool> {
        self.disconnect();

        let (name, port) = split_port(&self.host, secure);
        let name = name.to_string();
        let addresses: Vec<SocketAddr> = match tokio::net::lookup_host((name.as_str(), port)).await
        {
            Ok(addresses) => addresses.collect(),
            Err(e) => {
                tracing::debug!("Name resolution for {} failed: {}", name, e);
                return Err(MirrorError::NameResolution {
                    host: self.host.clone(),
                });
            }
        };
        if addresses.is_empty() {
            return Err(MirrorError::NameResolution {
                host: self.host.clone(),
            });
        }

        let timeout = if secure {
            self.options.secure_connect_timeout
        } else {
            self.options.connect_timeout
        };

        let adapters: Vec<Option<IpAddr>> = if self.options.bind_addresses.is_empty() {
            vec![None]
        } else {
            self.options.bind_addresses.iter().copied().map(Some).collect()
        };

        for adapter in &adapters {
            for address in &addresses {
                if let Some(local) = adapter {
                    if local.is_ipv4() != address.is_ipv4() {
                        continue;
                    }
                }

                let stream = match tokio::time::timeout(timeout, open_socket(*adapter, *address))
                    .await
                {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => {
                        tracing::debug!("Connect to {} via {:?} failed: {}", address, adapter, e);
                        continue;
                    }
                    Err(_) => {
                        tracing::debug!("Connect to {} via {:?} timed out", address, adapter);
                        continue;
                    }
                };

                let transport: BoxedTransport = if secure {
                    let connector = self.tls.connector()?;
                    match tokio::time::timeout(timeout, handshake(connector, name.clone(), stream))
                        .await
                    {
                        Ok(Ok(tls)) => tls,
                        Ok(Err(e)) => {
                            tracing::debug!("TLS handshake with {} failed: {}", address, e);
                            continue;
                        }
                        Err(_) => {
                            tracing::debug!("TLS handshake with {} timed out", address);
                            continue;
                        }
                    }
                } else {
                    Box::new(stream)
                };

                self.attach(transport, secure);
                tracing::debug!(
                    "Connected to {} ({}) secure={}",
                    self.host,
                    address,
                    secure
                );
                return Ok(true);
            }
        }

        tracing::debug!("All connection attempts to {} failed", self.host);
        Ok(false)
    }

    /// Installs an already open transport, e.g. an in-memory duplex in tests
    pub fn attach(&mut self, transport: BoxedTransport, secure: bool) {
        let (read_half, write_half) = tokio::io::split(transport);
        self.reader = Some(BufReader::new(read_half));
        self.writer = Some(write_half);
        self.secure = secure;
        self.state = AgentState::Connected;
    }

    /// Drops the connection
    pub fn disconnect(&mut self) {
        self.reader = None;
        self.writer = None;
        self.state = AgentState::Disconnected;
    }

    /// Writes the literal request text
    ///
    /// A disconnected agent reconnects first, keeping its last plain/secure mode. A transient
    /// write failure reconnects and tries once more; a fatal one is returned immediately.
    pub async fn send_request(&mut self, request: &str) -> crate::Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let secure = self.secure;
            if self.state == AgentState::Disconnected && !self.connect(secure).await? {
                return Err(MirrorError::ConnectFailed {
                    host: self.host.clone(),
                    secure: self.secure,
                });
            }

            match self.write_request(request).await {
                Ok(()) => {
                    self.state = AgentState::Connected;
                    return Ok(());
                }
                Err(e) if is_transient(&e) && attempt < SEND_ATTEMPTS => {
                    tracing::debug!("Send to {} failed ({}), reconnecting", self.host, e);
                    self.disconnect();
                }
                Err(e) => {
                    self.disconnect();
                    return Err(HttpError::Io(e).into());
                }
            }
        }
    }

    /// Reads one response
    ///
    /// Returns `Ok(None)` after a transient socket failure: the agent has reconnected and the
    /// caller must repeat the whole exchange.
    pub async fn get_response(&mut self) -> crate::Result<Option<HttpResponse>> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(HttpError::NotConnected.into());
        };

        self.state = AgentState::Receiving;
        match read_response(reader).await {
            Ok(response) => {
                self.state = AgentState::Connected;
                if response.connection_close {
                    tracing::trace!("{} closed the connection", self.host);
                    self.disconnect();
                }
                Ok(Some(response))
            }
            Err(HttpError::Io(e)) if is_transient(&e) => {
                tracing::debug!("Receive from {} failed ({}), reconnecting", self.host, e);
                let secure = self.secure;
                if !self.connect(secure).await? {
                    tracing::debug!("Reconnect to {} failed", self.host);
                }
                Ok(None)
            }
            Err(e) => {
                self.disconnect();
                Err(e.into())
            }
        }
    }

    async fn write_request(&mut self, request: &str) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        self.state = AgentState::Sending;
        writer.write_all(request.as_bytes()).await?;
        writer.flush().await
    }
}

async fn handshake(
    connector: TlsConnector,
    name: String,
    stream: TcpStream,
) -> HttpResult<BoxedTransport> {
    let server_name = ServerName::try_from(name.clone())
        .map_err(|e| HttpError::Tls(format!("invalid server name {}: {}", name, e)))?;
    let tls = connector.connect(server_name, stream).await?;
    Ok(Box::new(tls))
}

/// Returns true for socket errors that a reconnect can plausibly fix
pub fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::NotConnected
    )
}

/// Splits `name:port`, falling back to the scheme's default port
///
/// A bracketed IPv6 literal such as `[::1]:8080` comes back without its brackets.
pub fn split_port(host: &str, secure: bool) -> (&str, u16) {
    let default = if secure { HTTPS_PORT } else { HTTP_PORT };
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((address, "")) => (address, default),
            Some((address, port)) => match port.strip_prefix(':').map(str::parse) {
                Some(Ok(port)) => (address, port),
                _ => (address, default),
            },
            None => (host, default),
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => match port.parse() {
            Ok(port) => (name, port),
            Err(_) => (host, default),
        },
        _ => (host, default),
    }
}

async fn open_socket(adapter: Option<IpAddr>, address: SocketAddr) -> io::Result<TcpStream> {
    let Some(local) = adapter else {
        return TcpStream::connect(address).await;
    };
    let socket = if address.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.bind(SocketAddr::new(local, 0))?;
    socket.connect(address).await
}
