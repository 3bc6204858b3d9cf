//! ws-probe - Interactive test client for WebSocket endpoints.
//!
//! This library provides a single-connection WebSocket client whose whole
//! lifecycle is observable: connect to a URL, send text messages, and keep
//! a transcript of what the peer sends back.
//!
//! # Architecture
//!
//! - **Connection Manager**: Owns at most one socket, exposes
//!   connect/disconnect/send, republishes socket events as state
//! - **Transport**: One tokio task per socket, reporting open, message,
//!   error and close events
//! - **Console**: Terminal surface rendering state and reading commands
//!
//! Key design principles:
//!
//! - No protocol: inbound text is kept verbatim or, if it parses, as JSON
//! - No retry: every reconnection is a fresh manual `connect`
//! - Single owner: the UI never touches the socket
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_probe::{ClientOptions, ConnectionManager, Result, Transition};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let mut manager = ConnectionManager::new(ClientOptions::default());
//!     manager.connect("ws://127.0.0.1:9999/ws?peer_id")?;
//!
//!     while let Ok(transition) = manager.recv().await {
//!         match transition {
//!             Transition::Opened => manager.send("hello")?,
//!             Transition::Received(entry) => println!("{}", entry.render()),
//!             Transition::Errored(_) | Transition::Closed(_) => break,
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cli`] | Command-line definition |
//! | [`client`] | [`ConnectionManager`], [`ClientState`], [`ClientOptions`] |
//! | [`console`] | Interactive terminal surface |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Transcript entries and socket events |
//! | [`transport`] | WebSocket client socket and local peer |

// ============================================================================
// Modules
// ============================================================================

/// Command-line definition for the `ws-probe` binary.
pub mod cli;

/// Connection management.
///
/// - [`ConnectionManager`] - Owns the active socket
/// - [`ClientState`] - Status, error, transcript, staged text
pub mod client;

/// Interactive terminal surface.
pub mod console;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Transcript entries and socket lifecycle events.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ClientOptions, ClientState, ConnectionManager, ConnectionState, DEFAULT_URL, Transition,
};

// Console types
pub use console::{Console, OutputFormat, Renderer};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SocketId;

// Protocol types
pub use protocol::{CloseInfo, MessageEntry, SocketEvent};

// Transport types
pub use transport::{PeerServer, ReadyState, Socket};
