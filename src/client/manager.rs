//! Connection manager.
//!
//! Owns at most one outbound [`Socket`] and turns its lifecycle events into
//! [`ClientState`]. The UI surface reads state and calls
//! `connect`/`disconnect`/`send`; it never touches the socket.
//!
//! # Transitions
//!
//! | Trigger | Status | Error | Transcript | Socket |
//! |---------|--------|-------|------------|--------|
//! | `connect` | Disconnected | cleared (set on construction failure) | cleared | replaced |
//! | open event | Connected | - | - | - |
//! | message event | - | - | appended | - |
//! | error event | Disconnected | fixed message | kept | dropped |
//! | close event | Disconnected | set if unclean | kept | dropped |
//! | `disconnect` | Disconnected | cleared | cleared | closed, dropped |
//! | `send` while not open | - | not-connected message | - | - |
//!
//! Events from a socket that is no longer the active one are ignored.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SocketId;
use crate::protocol::{CloseInfo, MessageEntry, SocketEvent};
use crate::transport::{EventReceiver, EventSender, Socket};

use super::options::ClientOptions;
use super::state::{ClientState, ConnectionState};

// ============================================================================
// Constants
// ============================================================================

/// Error shown for a transport error event. The event carries no detail.
pub const CONNECTION_ERROR_MESSAGE: &str = "WebSocket connection error. Check logs for details.";

/// Close reason shown when an unclean close carried none.
pub const UNKNOWN_CLOSE_REASON: &str = "Unknown reason";

/// Error shown when socket construction failed without a message.
const CONSTRUCTION_FALLBACK: &str = "An unknown error occurred";

// ============================================================================
// Transition
// ============================================================================

/// State change caused by one socket event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Handshake completed; now connected.
    Opened,
    /// Entry appended to the transcript.
    Received(MessageEntry),
    /// Transport error; now disconnected.
    Errored(String),
    /// Connection finished; now disconnected.
    Closed(CloseInfo),
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Single owner of the active socket.
///
/// # Example
///
/// ```ignore
/// let mut manager = ConnectionManager::new(ClientOptions::default());
/// manager.connect("ws://127.0.0.1:9999/ws?peer_id")?;
///
/// loop {
///     match manager.recv().await? {
///         Transition::Opened => manager.send("hello")?,
///         Transition::Received(entry) => println!("{}", entry.render()),
///         _ => break,
///     }
/// }
/// ```
pub struct ConnectionManager {
    options: ClientOptions,
    state: ClientState,
    /// Active socket, if any.
    socket: Option<Socket>,
    /// Generation for the next socket.
    next_id: SocketId,
    /// Cloned into every socket.
    events_tx: EventSender,
    events_rx: EventReceiver,
    status_tx: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    /// Creates a disconnected manager.
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            options,
            state: ClientState::default(),
            socket: None,
            next_id: SocketId::new(1),
            events_tx,
            events_rx,
            status_tx,
        }
    }

    /// Returns the options the manager was created with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionState {
        self.state.status()
    }

    /// Returns `true` when connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Returns `true` while a socket is connecting or open.
    #[inline]
    #[must_use]
    pub fn has_active_socket(&self) -> bool {
        self.socket.is_some()
    }

    /// Returns the generation of the active socket.
    #[inline]
    #[must_use]
    pub fn active_socket_id(&self) -> Option<SocketId> {
        self.socket.as_ref().map(Socket::id)
    }

    /// Subscribes to connection state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }
}

// ============================================================================
// ConnectionManager - Operations
// ============================================================================

impl ConnectionManager {
    /// Starts connecting to `url`.
    ///
    /// Closes any existing socket first and clears the error and the
    /// transcript. The URL is passed through verbatim. The handshake outcome
    /// arrives through [`recv`](Self::recv).
    ///
    /// # Errors
    ///
    /// Returns the construction error (also stored as the error state) if
    /// the socket could not be created.
    pub fn connect(&mut self, url: &str) -> Result<()> {
        if let Some(previous) = self.socket.take() {
            debug!(id = %previous.id(), url = previous.url(), "Closing previous socket");
            previous.close();
        }

        self.set_status(ConnectionState::Disconnected);
        self.state.clear_error();
        self.state.clear_messages();

        let id = self.next_id;
        self.next_id = id.next();

        info!(%id, url, "Connecting");

        match Socket::open(id, url, self.options.timeouts(), self.events_tx.clone()) {
            Ok(socket) => {
                self.socket = Some(socket);
                Ok(())
            }
            Err(e) => {
                warn!(%id, error = %e, "Failed to create socket");
                let message = e.to_string();
                if message.is_empty() {
                    self.state.set_error(CONSTRUCTION_FALLBACK);
                } else {
                    self.state.set_error(message);
                }
                Err(e)
            }
        }
    }

    /// Closes the active socket, if any, and resets the transcript.
    ///
    /// Does not wait for the close to complete. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(socket) = self.socket.take() {
            info!(id = %socket.id(), "Disconnecting (manual)");
            socket.close();
        }

        self.set_status(ConnectionState::Disconnected);
        self.state.clear_error();
        self.state.clear_messages();
    }

    /// Sends `text` verbatim over the open socket and clears the staged text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] (also stored as the error state) when
    /// no socket is open.
    pub fn send(&mut self, text: &str) -> Result<()> {
        let result = match self.socket.as_ref() {
            Some(socket) => socket.send(text),
            None => Err(Error::NotConnected),
        };

        match result {
            Ok(()) => {
                trace!(len = text.len(), "Message queued");
                self.state.clear_pending();
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "Send rejected");
                self.state.set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Replaces the staged outbound text.
    pub fn stage(&mut self, text: impl Into<String>) {
        self.state.set_pending(text);
    }

    /// Sends the staged text.
    ///
    /// Returns `Ok(false)` without sending when connected but nothing is
    /// staged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] when no socket is open, staged text
    /// or not.
    pub fn send_pending(&mut self) -> Result<bool> {
        let open = self.socket.as_ref().is_some_and(Socket::is_open);
        if open && self.state.pending().is_empty() {
            trace!("Nothing staged");
            return Ok(false);
        }

        let text = self.state.pending().to_owned();
        self.send(&text).map(|()| true)
    }
}

// ============================================================================
// ConnectionManager - Events
// ============================================================================

impl ConnectionManager {
    /// Waits for the next event of the active socket and applies it.
    ///
    /// Cancel-safe: no event is lost if the future is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event channel closed.
    pub async fn recv(&mut self) -> Result<Transition> {
        loop {
            let (id, event) = self.events_rx.recv().await.ok_or(Error::ConnectionClosed)?;

            if let Some(transition) = self.apply(id, event) {
                return Ok(transition);
            }
        }
    }

    /// Applies one socket event.
    ///
    /// Returns `None` if the event came from a socket that is not active.
    pub fn apply(&mut self, id: SocketId, event: SocketEvent) -> Option<Transition> {
        if self.active_socket_id() != Some(id) {
            trace!(%id, ?event, "Ignoring event from inactive socket");
            return None;
        }

        let terminal = event.is_terminal();
        let transition = match event {
            SocketEvent::Open => {
                self.set_status(ConnectionState::Connected);
                Transition::Opened
            }

            SocketEvent::Message(payload) => {
                let entry = MessageEntry::decode(&payload);
                trace!(%id, structured = entry.is_structured(), "Message appended");
                self.state.push_message(entry.clone());
                Transition::Received(entry)
            }

            SocketEvent::Error(detail) => {
                warn!(%id, %detail, "WebSocket error");
                self.state.set_error(CONNECTION_ERROR_MESSAGE);
                self.set_status(ConnectionState::Disconnected);
                Transition::Errored(CONNECTION_ERROR_MESSAGE.to_owned())
            }

            SocketEvent::Close(info) => {
                info!(%id, code = info.code, reason = %info.reason, clean = info.was_clean, "WebSocket closed");
                self.set_status(ConnectionState::Disconnected);
                if !info.was_clean {
                    self.state.set_error(unexpected_close_message(&info));
                }
                Transition::Closed(info)
            }
        };

        if terminal {
            self.socket = None;
        }

        Some(transition)
    }

    fn set_status(&mut self, status: ConnectionState) {
        self.state.set_status(status);
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

/// Error text for an unclean close.
fn unexpected_close_message(info: &CloseInfo) -> String {
    let reason = if info.reason.is_empty() {
        UNKNOWN_CLOSE_REASON
    } else {
        info.reason.as_str()
    };
    format!("Connection closed unexpectedly: {reason}")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;
    use tokio_test::{assert_pending, task};

    use crate::transport::{Peer, PeerServer};

    async fn server() -> PeerServer {
        PeerServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed")
    }

    async fn next(manager: &mut ConnectionManager) -> Transition {
        timeout(Duration::from_secs(5), manager.recv())
            .await
            .expect("transition within timeout")
            .expect("event channel open")
    }

    /// Connects to `server` and waits until open.
    async fn connected(server: &PeerServer) -> (ConnectionManager, Peer) {
        let mut manager = ConnectionManager::new(ClientOptions::default());
        manager.connect(&server.ws_url()).expect("connect");
        let peer = server.accept().await.expect("accept");
        assert_eq!(next(&mut manager).await, Transition::Opened);
        (manager, peer)
    }

    #[test]
    fn test_initial_state() {
        let manager = ConnectionManager::new(ClientOptions::default());
        assert_eq!(manager.status(), ConnectionState::Disconnected);
        assert!(!manager.has_active_socket());
        assert!(manager.state().error().is_none());
        assert!(manager.state().messages().is_empty());
    }

    #[test]
    fn test_recv_pending_without_socket() {
        let mut manager = ConnectionManager::new(ClientOptions::default());
        let mut recv = task::spawn(manager.recv());
        assert_pending!(recv.poll());
    }

    #[test]
    fn test_unexpected_close_message() {
        assert_eq!(
            unexpected_close_message(&CloseInfo::abnormal()),
            "Connection closed unexpectedly: Unknown reason"
        );

        let info = CloseInfo {
            code: 1011,
            reason: "server restart".into(),
            was_clean: false,
        };
        assert_eq!(
            unexpected_close_message(&info),
            "Connection closed unexpectedly: server restart"
        );
    }

    #[tokio::test]
    async fn test_connect_invalid_url_sets_error() {
        let mut manager = ConnectionManager::new(ClientOptions::default());
        let result = manager.connect("http://127.0.0.1:9999/ws");

        assert!(matches!(result, Err(Error::InvalidUrl { .. })));
        assert!(manager.state().error().is_some_and(|e| e.contains("ws")));
        assert_eq!(manager.status(), ConnectionState::Disconnected);
        assert!(!manager.has_active_socket());
    }

    #[tokio::test]
    async fn test_connect_opens() {
        let server = server().await;
        let (manager, peer) = connected(&server).await;

        assert!(manager.is_connected());
        assert!(manager.has_active_socket());
        assert_eq!(peer.path(), "/ws");
    }

    #[tokio::test]
    async fn test_refused_connection_sets_fixed_error() {
        let port = server().await.port();
        let mut manager = ConnectionManager::new(ClientOptions::default());
        manager
            .connect(&format!("ws://127.0.0.1:{port}/ws"))
            .expect("construction succeeds");

        assert_eq!(
            next(&mut manager).await,
            Transition::Errored(CONNECTION_ERROR_MESSAGE.into())
        );
        assert_eq!(manager.state().error(), Some(CONNECTION_ERROR_MESSAGE));
        assert_eq!(manager.status(), ConnectionState::Disconnected);
        assert!(!manager.has_active_socket());
    }

    #[tokio::test]
    async fn test_wss_handshake_failure_sets_error() {
        let server = server().await;
        let mut manager = ConnectionManager::new(ClientOptions::default());
        manager
            .connect(&server.ws_url().replacen("ws://", "wss://", 1))
            .expect("construction succeeds");
        let _accept = tokio::spawn(async move { server.accept().await.is_err() });

        assert_eq!(
            next(&mut manager).await,
            Transition::Errored(CONNECTION_ERROR_MESSAGE.into())
        );
        assert_eq!(manager.state().error(), Some(CONNECTION_ERROR_MESSAGE));
        assert_eq!(manager.status(), ConnectionState::Disconnected);
        assert!(!manager.has_active_socket());
    }

    #[tokio::test]
    async fn test_received_messages_decoded() {
        let server = server().await;
        let (mut manager, mut peer) = connected(&server).await;

        peer.send_text(r#"{"a":1}"#).await.expect("peer send");
        next(&mut manager).await;
        assert_eq!(
            manager.state().last_message(),
            Some(&MessageEntry::Structured(json!({"a": 1})))
        );

        peer.send_text("hello").await.expect("peer send");
        next(&mut manager).await;
        assert_eq!(
            manager.state().last_message(),
            Some(&MessageEntry::Raw("hello".into()))
        );
    }

    #[tokio::test]
    async fn test_json_looking_text_is_structured() {
        let server = server().await;
        let (mut manager, mut peer) = connected(&server).await;

        peer.send_text("1").await.expect("peer send");
        peer.send_text(r#"{"b":2}"#).await.expect("peer send");
        next(&mut manager).await;
        next(&mut manager).await;

        assert_eq!(
            manager.state().messages(),
            &[
                MessageEntry::Structured(json!(1)),
                MessageEntry::Structured(json!({"b": 2})),
            ]
        );
    }

    #[tokio::test]
    async fn test_send_when_connected() {
        let server = server().await;
        let (mut manager, mut peer) = connected(&server).await;

        manager.stage(" exact text ");
        assert!(manager.send_pending().expect("send"));
        assert_eq!(
            peer.recv_text().await.expect("peer recv").as_deref(),
            Some(" exact text ")
        );

        assert!(manager.state().pending().is_empty());
        assert!(manager.state().error().is_none());
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn test_send_pending_empty_is_noop() {
        let server = server().await;
        let (mut manager, _peer) = connected(&server).await;

        assert!(!manager.send_pending().expect("noop"));
        assert!(manager.state().error().is_none());
    }

    #[test]
    fn test_send_when_disconnected_sets_error() {
        let mut manager = ConnectionManager::new(ClientOptions::default());
        manager.stage("queued");

        assert!(matches!(manager.send("hi"), Err(Error::NotConnected)));
        assert_eq!(
            manager.state().error(),
            Some("Cannot send message: WebSocket is not connected.")
        );
        assert_eq!(manager.state().pending(), "queued");

        manager.stage("");
        assert!(matches!(manager.send_pending(), Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_send_while_connecting_sets_error() {
        let server = server().await;
        let mut manager = ConnectionManager::new(ClientOptions::default());
        manager.connect(&server.ws_url()).expect("connect");

        // handshake cannot finish before accept
        assert!(matches!(manager.send("early"), Err(Error::NotConnected)));
        assert!(manager.state().error().is_some());
    }

    #[tokio::test]
    async fn test_abrupt_close_mentions_unexpectedly() {
        let server = server().await;
        let (mut manager, mut peer) = connected(&server).await;

        peer.send_text("last words").await.expect("peer send");
        next(&mut manager).await;
        peer.abort();

        match next(&mut manager).await {
            Transition::Closed(info) => assert_eq!(info.code, 1006),
            other => panic!("expected close, got {other:?}"),
        }
        assert!(manager.state().error().is_some_and(|e| e.contains("unexpectedly")));
        assert_eq!(manager.status(), ConnectionState::Disconnected);
        assert!(!manager.has_active_socket());
        // transcript survives until the next user action
        assert_eq!(manager.state().messages().len(), 1);
    }

    #[tokio::test]
    async fn test_clean_close_keeps_error_clear() {
        let server = server().await;
        let (mut manager, peer) = connected(&server).await;

        peer.close(1000, "bye").await.expect("peer close");

        assert_eq!(
            next(&mut manager).await,
            Transition::Closed(CloseInfo::clean(1000, "bye"))
        );
        assert!(manager.state().error().is_none());
        assert_eq!(manager.status(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_while_connected() {
        let server = server().await;
        let (mut manager, mut peer) = connected(&server).await;

        peer.send_text("x").await.expect("peer send");
        next(&mut manager).await;

        manager.disconnect();
        assert!(!manager.has_active_socket());
        assert_eq!(manager.status(), ConnectionState::Disconnected);
        assert!(manager.state().messages().is_empty());

        // peer observes the close request
        assert_eq!(peer.recv_text().await.expect("peer recv"), None);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut manager = ConnectionManager::new(ClientOptions::default());
        let _ = manager.send("x");
        assert!(manager.state().error().is_some());

        manager.disconnect();
        let after_first = manager.state().clone();
        manager.disconnect();

        assert_eq!(manager.state(), &after_first);
        assert!(manager.state().error().is_none());
        assert_eq!(manager.status(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_socket() {
        let server = server().await;
        let (mut manager, mut first_peer) = connected(&server).await;
        let first_id = manager.active_socket_id().expect("active");

        first_peer.send_text("old").await.expect("peer send");
        next(&mut manager).await;

        manager.connect(&server.ws_url()).expect("reconnect");
        let second_id = manager.active_socket_id().expect("active");
        assert_ne!(first_id, second_id);
        assert!(manager.state().messages().is_empty());

        // prior socket is closed
        assert_eq!(first_peer.recv_text().await.expect("peer recv"), None);

        let _second_peer = server.accept().await.expect("accept");
        // the first socket's close event is skipped
        assert_eq!(next(&mut manager).await, Transition::Opened);
        assert_eq!(manager.active_socket_id(), Some(second_id));
        assert!(manager.state().error().is_none());
    }

    #[tokio::test]
    async fn test_events_from_inactive_socket_ignored() {
        let server = server().await;
        let (mut manager, _peer) = connected(&server).await;

        let stale = SocketId::new(999);
        assert!(manager.apply(stale, SocketEvent::Error("late".into())).is_none());
        assert!(manager.is_connected());
        assert!(manager.state().error().is_none());
    }

    #[tokio::test]
    async fn test_connect_clears_error_and_transcript() {
        let server = server().await;
        let (mut manager, mut peer) = connected(&server).await;

        peer.send_text("kept").await.expect("peer send");
        next(&mut manager).await;
        peer.abort();
        next(&mut manager).await;
        assert!(manager.state().error().is_some());
        assert_eq!(manager.state().messages().len(), 1);

        manager.connect(&server.ws_url()).expect("connect");
        assert!(manager.state().error().is_none());
        assert!(manager.state().messages().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_tracks_status() {
        let server = server().await;
        let mut manager = ConnectionManager::new(ClientOptions::default());
        let mut status = manager.subscribe();
        assert_eq!(*status.borrow(), ConnectionState::Disconnected);

        manager.connect(&server.ws_url()).expect("connect");
        let _peer = server.accept().await.expect("accept");
        next(&mut manager).await;

        assert!(status.has_changed().expect("sender alive"));
        assert_eq!(*status.borrow_and_update(), ConnectionState::Connected);

        manager.disconnect();
        assert_eq!(*status.borrow_and_update(), ConnectionState::Disconnected);
    }
}
