//! Message and socket lifecycle types.
//!
//! The probe speaks no protocol of its own: every inbound text frame is
//! recorded verbatim or, when it happens to be valid JSON, as a decoded
//! value. This module defines those transcript entries and the lifecycle
//! events a socket reports to its owner.
//!
//! # Event Order
//!
//! | Event | Count | Meaning |
//! |-------|-------|---------|
//! | `Open` | 0..1 | Handshake accepted |
//! | `Message` | 0..n | Text frame received |
//! | `Error` / `Close` | exactly 1 | Terminal, nothing follows |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | [`SocketEvent`] and [`CloseInfo`] |
//! | `message` | [`MessageEntry`] decode heuristic and rendering |

// ============================================================================
// Submodules
// ============================================================================

/// Socket lifecycle events.
pub mod event;

/// Transcript entries.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{ABNORMAL_CLOSURE, CloseInfo, NORMAL_CLOSURE, SocketEvent};
pub use message::MessageEntry;
