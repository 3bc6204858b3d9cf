//! Socket lifecycle events.
//!
//! A socket's event-loop task reports everything that happens on the wire
//! through [`SocketEvent`]. The connection manager is the only consumer.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// Constants
// ============================================================================

/// Close code for a normal, intentional closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the connection dropped without a close frame.
///
/// Never sent on the wire (RFC 6455 Section 7.4.1).
pub const ABNORMAL_CLOSURE: u16 = 1006;

// ============================================================================
// CloseInfo
// ============================================================================

/// Details of a finished connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseInfo {
    /// Close code from the close frame, or [`ABNORMAL_CLOSURE`].
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
    /// Whether the closing handshake completed.
    pub was_clean: bool,
}

impl CloseInfo {
    /// A close whose handshake completed.
    #[inline]
    #[must_use]
    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// A connection that ended without a closing handshake.
    #[inline]
    #[must_use]
    pub fn abnormal() -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: String::new(),
            was_clean: false,
        }
    }
}

// ============================================================================
// SocketEvent
// ============================================================================

/// Something that happened on an outbound socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed; the socket is open.
    Open,
    /// Text frame received from the peer.
    Message(String),
    /// Transport failure. The detail is diagnostic only.
    Error(String),
    /// The connection finished.
    Close(CloseInfo),
}

impl SocketEvent {
    /// Returns `true` for the events that end a socket's life.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Close(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abnormal_close() {
        let info = CloseInfo::abnormal();
        assert_eq!(info.code, 1006);
        assert!(info.reason.is_empty());
        assert!(!info.was_clean);
    }

    #[test]
    fn test_clean_close() {
        let info = CloseInfo::clean(NORMAL_CLOSURE, "bye");
        assert!(info.was_clean);
        assert_eq!(info.reason, "bye");
    }

    #[test]
    fn test_is_terminal() {
        assert!(!SocketEvent::Open.is_terminal());
        assert!(!SocketEvent::Message("x".into()).is_terminal());
        assert!(SocketEvent::Error("boom".into()).is_terminal());
        assert!(SocketEvent::Close(CloseInfo::abnormal()).is_terminal());
    }
}
