//! Local WebSocket peer.
//!
//! [`PeerServer`] accepts inbound WebSocket connections so the client can be
//! exercised without external infrastructure. It backs the `serve`
//! subcommand (an echo peer) and the crate's tests.
//!
//! # Connection Flow
//!
//! 1. `PeerServer::bind` - Bind to an address (port 0 picks a random port)
//! 2. Client connects to `ws_url()`, optionally with `?peer_id=<id>`
//! 3. `PeerServer::accept` - TCP accept and WebSocket upgrade
//! 4. [`Peer`] - Exchange text frames, then close or abort

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for waiting for a client to connect.
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Query parameter the collaborating server uses to identify peers.
const PEER_ID_PARAM: &str = "peer_id";

/// Outcome of the handshake callback.
type HandshakeResult = std::result::Result<Response, ErrorResponse>;

// ============================================================================
// PeerServer
// ============================================================================

/// A bound WebSocket listener.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use ws_probe::transport::PeerServer;
///
/// let server = PeerServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("connect to {}", server.ws_url());
///
/// let mut peer = server.accept().await?;
/// peer.send_text("hello").await?;
/// ```
pub struct PeerServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the server is bound to.
    addr: SocketAddr,
}

impl PeerServer {
    /// Binds to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(%addr, "Peer server bound");

        Ok(Self { listener, addr })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://{addr}/ws`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Accepts one client and completes the upgrade.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no client connects within 30s
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    pub async fn accept(&self) -> Result<Peer> {
        let (stream, addr) = timeout(ACCEPT_TIMEOUT, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(ACCEPT_TIMEOUT.as_millis() as u64))??;

        debug!(?addr, "TCP connection accepted");

        Peer::upgrade(stream, addr).await
    }

    /// Runs an echo peer until the listener fails.
    ///
    /// Every accepted client gets its text frames sent straight back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if accepting on the listener fails.
    pub async fn serve_echo(self) -> Result<()> {
        info!(url = %self.ws_url(), "Echo peer listening");

        loop {
            let (stream, addr) = self.listener.accept().await?;

            tokio::spawn(async move {
                match Peer::upgrade(stream, addr).await {
                    Ok(peer) => peer.echo().await,
                    Err(e) => warn!(error = %e, ?addr, "Upgrade failed"),
                }
            });
        }
    }
}

// ============================================================================
// Peer
// ============================================================================

/// Server side of one accepted WebSocket.
pub struct Peer {
    stream: WebSocketStream<TcpStream>,
    remote_addr: SocketAddr,
    path: String,
    query: Option<String>,
}

impl Peer {
    /// Upgrades a TCP stream, recording the request target.
    async fn upgrade(stream: TcpStream, remote_addr: SocketAddr) -> Result<Self> {
        let mut target = None;
        let callback = |request: &Request, response: Response| -> HandshakeResult {
            let uri = request.uri();
            target = Some((uri.path().to_owned(), uri.query().map(str::to_owned)));
            Ok(response)
        };

        let stream = accept_hdr_async(stream, callback)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        let (path, query) = target.unwrap_or_else(|| ("/".to_owned(), None));
        let peer = Self {
            stream,
            remote_addr,
            path,
            query,
        };

        info!(
            addr = %peer.remote_addr,
            path = %peer.path,
            peer_id = peer.peer_id().as_deref().unwrap_or("-"),
            "WebSocket connection established"
        );

        Ok(peer)
    }

    /// Returns the request path of the handshake.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query of the handshake, if any.
    #[inline]
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the `peer_id` query parameter.
    ///
    /// A bare `?peer_id` yields an empty string.
    #[must_use]
    pub fn peer_id(&self) -> Option<String> {
        let query = self.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == PEER_ID_PARAM)
            .map(|(_, value)| value.into_owned())
    }

    /// Sends one text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Receives the next text frame.
    ///
    /// Returns `None` once the client closed or the stream ended.
    pub async fn recv_text(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    /// Closes with the given code and waits for the client's reply.
    pub async fn close(mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: code.into(),
            reason: reason.into(),
        };
        self.stream.close(Some(frame)).await?;

        while let Some(Ok(_)) = self.stream.next().await {}
        debug!(addr = %self.remote_addr, code, "Peer closed");
        Ok(())
    }

    /// Drops the TCP connection without a closing handshake.
    pub fn abort(self) {
        debug!(addr = %self.remote_addr, "Peer aborted");
        drop(self.stream);
    }

    /// Echoes text frames until the client leaves.
    pub async fn echo(mut self) {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    debug!(addr = %self.remote_addr, len = text.len(), "Echoing text frame");
                    if let Err(e) = self.stream.send(Message::Text(text)).await {
                        warn!(error = %e, "Echo failed");
                        break;
                    }
                }
                // the close reply goes out on the next poll
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "Peer stream error");
                    break;
                }
            }
        }

        info!(addr = %self.remote_addr, "Peer disconnected");
    }
}

// ============================================================================
// Tests
// ============================================================================
