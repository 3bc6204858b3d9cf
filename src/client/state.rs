//! Observable client state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

use crate::protocol::MessageEntry;

// ============================================================================
// ConnectionState
// ============================================================================

/// Whether the active socket is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No open socket. Initial state.
    #[default]
    Disconnected,
    /// The active socket completed its handshake.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Connected => f.write_str("Connected"),
        }
    }
}

// ============================================================================
// ClientState
// ============================================================================

/// Everything the UI surface renders.
///
/// Mutated only by the connection manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientState {
    status: ConnectionState,
    error: Option<String>,
    messages: Vec<MessageEntry>,
    pending: String,
}

impl ClientState {
    /// Current connection state.
    #[inline]
    #[must_use]
    pub const fn status(&self) -> ConnectionState {
        self.status
    }

    /// Returns `true` when connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionState::Connected
    }

    /// Last error, if any.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Received messages in arrival order.
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &[MessageEntry] {
        &self.messages
    }

    /// Most recently received message.
    #[inline]
    #[must_use]
    pub fn last_message(&self) -> Option<&MessageEntry> {
        self.messages.last()
    }

    /// Text staged for sending.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }
}

impl ClientState {
    pub(crate) fn set_status(&mut self, status: ConnectionState) {
        self.status = status;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn push_message(&mut self, entry: MessageEntry) {
        self.messages.push(entry);
    }

    pub(crate) fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub(crate) fn set_pending(&mut self, text: impl Into<String>) {
        self.pending = text.into();
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
