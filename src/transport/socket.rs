//! Outbound WebSocket and its event loop.
//!
//! A [`Socket`] is a handle to one client connection. Construction is
//! synchronous: the URL is validated and a tokio task is spawned that
//! performs the handshake and then shuttles frames. Everything that
//! happens on the wire is reported as a [`SocketEvent`] tagged with the
//! socket's [`SocketId`].
//!
//! # Event Loop
//!
//! The spawned task handles:
//!
//! - The opening handshake (bounded by the connect timeout)
//! - Incoming text frames from the peer
//! - Outgoing text frames queued through [`Socket::send`]
//! - The closing handshake, from either side
//!
//! Exactly one terminal event (`Error` or `Close`) is emitted per socket.
//! A supervisor task reports an `Error` if the event loop dies first.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, Once};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::SocketId;
use crate::protocol::{CloseInfo, NORMAL_CLOSURE, SocketEvent};

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for the opening handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time to wait for the peer's close frame after we sent ours.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code reported when the peer's close frame carried no status.
const NO_STATUS_RECEIVED: u16 = 1005;

// ============================================================================
// Types
// ============================================================================

/// Channel on which sockets report their events.
pub type EventSender = mpsc::UnboundedSender<(SocketId, SocketEvent)>;

/// Receiving side of [`EventSender`].
pub type EventReceiver = mpsc::UnboundedReceiver<(SocketId, SocketEvent)>;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

// ============================================================================
// ReadyState
// ============================================================================

/// Lifecycle position of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting,
    /// Frames can be exchanged.
    Open,
    /// Close requested, waiting for the peer.
    Closing,
    /// Finished.
    Closed,
}

// ============================================================================
// SocketTimeouts
// ============================================================================

/// Time bounds applied by the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketTimeouts {
    /// Opening handshake limit.
    pub connect: Duration,
    /// Wait for the peer's close frame after a local close.
    pub close: Duration,
}

impl Default for SocketTimeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_CONNECT_TIMEOUT,
            close: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

// ============================================================================
// SocketCommand
// ============================================================================

/// Internal commands for the event loop.
enum SocketCommand {
    /// Send a text frame.
    Send(String),
    /// Start the closing handshake.
    Close,
}

// ============================================================================
// Socket
// ============================================================================

/// Handle to one outbound WebSocket.
///
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct Socket {
    /// Generation of this socket.
    id: SocketId,
    /// URL exactly as supplied.
    url: String,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<SocketCommand>,
    /// Ready state (shared with event loop).
    ready_state: Arc<Mutex<ReadyState>>,
}

impl Socket {
    /// Validates `url` and starts connecting.
    ///
    /// Returns as soon as the event loop is spawned; the outcome of the
    /// handshake arrives later on `events`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the URL does not parse, is not `ws`/`wss`,
    ///   or carries a fragment
    /// - [`Error::Runtime`] if called outside a tokio runtime
    pub fn open(
        id: SocketId,
        url: &str,
        timeouts: SocketTimeouts,
        events: EventSender,
    ) -> Result<Self> {
        let parsed = validate_url(url)?;
        let handle = Handle::try_current().map_err(|e| Error::runtime(e.to_string()))?;
        install_crypto_provider();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let ready_state = Arc::new(Mutex::new(ReadyState::Connecting));

        let event_loop = EventLoop {
            id,
            events: events.clone(),
            ready_state: Arc::clone(&ready_state),
        };
        let task = handle.spawn(event_loop.run(parsed, timeouts, command_rx));
        handle.spawn(supervise(id, task, events, Arc::clone(&ready_state)));

        debug!(%id, url, "Socket connecting");

        Ok(Self {
            id,
            url: url.to_owned(),
            command_tx,
            ready_state,
        })
    }

    /// Returns the socket's generation.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SocketId {
        self.id
    }

    /// Returns the URL this socket was opened with.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the current ready state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        *self.ready_state.lock()
    }

    /// Returns `true` if frames can be sent.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Queues `text` as one text frame, unmodified.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] unless the socket is open
    /// - [`Error::ConnectionClosed`] if the event loop has exited
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }

        self.command_tx
            .send(SocketCommand::Send(text.into()))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Requests the connection to close.
    ///
    /// Fire-and-forget; valid in any ready state.
    pub fn close(&self) {
        {
            let mut state = self.ready_state.lock();
            if *state != ReadyState::Closed {
                *state = ReadyState::Closing;
            }
        }

        let _ = self.command_tx.send(SocketCommand::Close);
        trace!(id = %self.id, "Close requested");
    }
}

// ============================================================================
// URL Validation
// ============================================================================

/// Checks that `url` is usable as a WebSocket endpoint.
///
/// The URL is otherwise passed through verbatim; query components such as
/// `?peer_id` are not interpreted.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;

    match parsed.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::invalid_url(
                url,
                format!("scheme must be 'ws' or 'wss', got '{other}'"),
            ));
        }
    }

    if parsed.fragment().is_some() {
        return Err(Error::invalid_url(url, "fragments are not allowed"));
    }

    Ok(parsed)
}

// ============================================================================
// TLS
// ============================================================================

static CRYPTO_PROVIDER: Once = Once::new();

/// Installs the process-wide rustls provider used by `wss://` handshakes.
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            trace!("Crypto provider already installed");
        }
    });
}

// ============================================================================
// EventLoop
// ============================================================================

/// State owned by the spawned task.
struct EventLoop {
    id: SocketId,
    events: EventSender,
    ready_state: Arc<Mutex<ReadyState>>,
}

impl EventLoop {
    /// Drives one socket from handshake to its terminal event.
    async fn run(
        self,
        url: Url,
        timeouts: SocketTimeouts,
        mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    ) {
        let Some(ws_stream) = self.handshake(&url, timeouts, &mut command_rx).await else {
            return;
        };

        {
            let mut state = self.ready_state.lock();
            if *state == ReadyState::Connecting {
                *state = ReadyState::Open;
            }
        }
        info!(id = %self.id, url = %url, "WebSocket connection established");
        self.emit(SocketEvent::Open);

        let (ws_write, ws_read) = ws_stream.split();
        let terminal = self
            .exchange(ws_write, ws_read, timeouts, &mut command_rx)
            .await;

        self.finish(terminal);
        debug!(id = %self.id, "Event loop terminated");
    }

    /// Performs the opening handshake, honoring an early close request.
    async fn handshake(
        &self,
        url: &Url,
        timeouts: SocketTimeouts,
        command_rx: &mut mpsc::UnboundedReceiver<SocketCommand>,
    ) -> Option<WsStream> {
        let connect = timeout(timeouts.connect, connect_async(url.as_str()));
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => {
                    return match result {
                        Ok(Ok((stream, response))) => {
                            debug!(id = %self.id, status = %response.status(), "Handshake accepted");
                            Some(stream)
                        }
                        Ok(Err(e)) => {
                            warn!(id = %self.id, error = %e, "Handshake failed");
                            self.finish(SocketEvent::Error(e.to_string()));
                            None
                        }
                        Err(_) => {
                            let err = Error::connection_timeout(timeouts.connect.as_millis() as u64);
                            warn!(id = %self.id, error = %err, "Handshake timed out");
                            self.finish(SocketEvent::Error(err.to_string()));
                            None
                        }
                    };
                }

                command = command_rx.recv() => {
                    match command {
                        Some(SocketCommand::Send(_)) => {
                            trace!(id = %self.id, "Dropping send while connecting");
                        }
                        Some(SocketCommand::Close) | None => {
                            debug!(id = %self.id, "Closed before handshake completed");
                            self.finish(SocketEvent::Close(CloseInfo::abnormal()));
                            return None;
                        }
                    }
                }
            }
        }
    }

    /// Exchanges frames until the connection ends. Returns the terminal event.
    async fn exchange(
        &self,
        mut ws_write: WsWrite,
        mut ws_read: WsRead,
        timeouts: SocketTimeouts,
        command_rx: &mut mpsc::UnboundedReceiver<SocketCommand>,
    ) -> SocketEvent {
        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(id = %self.id, len = text.len(), "Text frame received");
                            self.emit(SocketEvent::Message(text.as_str().to_owned()));
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(id = %self.id, ?frame, "WebSocket closed by remote");
                            // flushes the automatic close reply
                            let _ = ws_write.flush().await;
                            return SocketEvent::Close(close_info(frame));
                        }

                        Some(Ok(Message::Binary(data))) => {
                            debug!(id = %self.id, len = data.len(), "Ignoring binary frame");
                        }

                        // Ping/Pong are answered by tungstenite
                        Some(Ok(_)) => {}

                        Some(Err(e)) => return classify_error(self.id, e),

                        None => {
                            debug!(id = %self.id, "WebSocket stream ended");
                            return SocketEvent::Close(CloseInfo::abnormal());
                        }
                    }
                }

                // Commands from the handle
                command = command_rx.recv() => {
                    match command {
                        Some(SocketCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(id = %self.id, error = %e, "Failed to send text frame");
                            } else {
                                trace!(id = %self.id, "Text frame sent");
                            }
                        }

                        Some(SocketCommand::Close) | None => {
                            return self.close_handshake(ws_write, ws_read, timeouts).await;
                        }
                    }
                }
            }
        }
    }

    /// Sends our close frame and waits for the peer's.
    async fn close_handshake(
        &self,
        mut ws_write: WsWrite,
        mut ws_read: WsRead,
        timeouts: SocketTimeouts,
    ) -> SocketEvent {
        *self.ready_state.lock() = ReadyState::Closing;

        let frame = CloseFrame {
            code: CloseCode::from(NORMAL_CLOSURE),
            reason: "".into(),
        };
        if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
            debug!(id = %self.id, error = %e, "Failed to send close frame");
            return SocketEvent::Close(CloseInfo::abnormal());
        }

        let drain = async {
            while let Some(message) = ws_read.next().await {
                match message {
                    Ok(Message::Close(frame)) => return close_info(frame),
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
            CloseInfo::abnormal()
        };

        match timeout(timeouts.close, drain).await {
            Ok(info) => SocketEvent::Close(info),
            Err(_) => {
                warn!(id = %self.id, "Peer did not acknowledge close");
                SocketEvent::Close(CloseInfo::abnormal())
            }
        }
    }

    /// Marks the socket closed and emits the terminal event.
    fn finish(&self, event: SocketEvent) {
        *self.ready_state.lock() = ReadyState::Closed;
        self.emit(event);
    }

    fn emit(&self, event: SocketEvent) {
        if self.events.send((self.id, event)).is_err() {
            trace!(id = %self.id, "Event receiver gone");
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Waits for the event loop and reports an `Error` if it ended without
/// emitting a terminal event.
async fn supervise(
    id: SocketId,
    task: JoinHandle<()>,
    events: EventSender,
    ready_state: Arc<Mutex<ReadyState>>,
) {
    let Err(e) = task.await else {
        return;
    };

    let was_closed = {
        let mut state = ready_state.lock();
        std::mem::replace(&mut *state, ReadyState::Closed) == ReadyState::Closed
    };
    if was_closed {
        debug!(%id, error = %e, "Event loop aborted after terminal event");
        return;
    }

    error!(%id, error = %e, "Event loop aborted");
    if events.send((id, SocketEvent::Error(e.to_string()))).is_err() {
        trace!(%id, "Event receiver gone");
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts a received close frame into [`CloseInfo`].
fn close_info(frame: Option<CloseFrame>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo::clean(u16::from(frame.code), frame.reason.as_str()),
        None => CloseInfo::clean(NO_STATUS_RECEIVED, ""),
    }
}

/// Maps a read error to the terminal event it implies.
///
/// A connection that vanished without a closing handshake is an abnormal
/// close; anything else is a transport error.
fn classify_error(id: SocketId, error: WsError) -> SocketEvent {
    match error {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Io(_)
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            debug!(%id, error = %error, "Connection dropped without close frame");
            SocketEvent::Close(CloseInfo::abnormal())
        }
        other => {
            warn!(%id, error = %other, "WebSocket error");
            SocketEvent::Error(other.to_string())
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        // dropping command_tx ends the event loop
        trace!(id = %self.id, "Socket handle dropped");
    }
}

// ============================================================================
// Tests
// ============================================================================
