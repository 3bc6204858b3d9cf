//! WebSocket transport layer.
//!
//! This module owns the wire: the outbound client socket driven by the
//! connection manager, and a small local peer used to exercise it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌─────────────────┐
//! │  ConnectionManager   │                         │  Remote peer    │
//! │                      │        WebSocket        │  (any server,   │
//! │  Socket ─► EventLoop │◄───────────────────────►│   or PeerServer)│
//! │     ▲          │     │   ws://host/ws?peer_id  │                 │
//! │     └─ events ◄┘     │                         │                 │
//! └──────────────────────┘                         └─────────────────┘
//! ```
//!
//! # Socket Lifecycle
//!
//! 1. `Socket::open` - Validate URL, spawn the event loop (`Connecting`)
//! 2. Handshake completes - `Open` event
//! 3. Text frames in both directions - `Message` events
//! 4. Close from either side, or failure - one `Close` or `Error` event
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | Outbound WebSocket and its event loop |
//! | `server` | Local WebSocket peer (echo server, tests) |

// ============================================================================
// Submodules
// ============================================================================

/// Local WebSocket peer.
pub mod server;

/// Outbound WebSocket and its event loop.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use server::{Peer, PeerServer};
pub use socket::{
    EventReceiver, EventSender, ReadyState, Socket, SocketTimeouts, validate_url,
};
