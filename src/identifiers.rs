//! Type-safe identifiers.
//!
//! Each outbound socket gets a fresh [`SocketId`] so events from a
//! superseded socket can be told apart from events of the active one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SocketId
// ============================================================================

/// Generation number of an outbound socket.
///
/// Allocated by the connection manager, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(u64);

impl SocketId {
    /// Creates an ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the ID that follows this one.
    #[inline]
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
