//! Client configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use ws_probe::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_url("wss://echo.example.com/ws?peer_id=alice")
//!     .with_connect_timeout(Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::SocketTimeouts;
use crate::transport::socket::{DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};

// ============================================================================
// Constants
// ============================================================================

/// URL presented at startup. A convenience, not a contract.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:9999/ws?peer_id";

// ============================================================================
// ClientOptions
// ============================================================================

/// Settings for a [`ConnectionManager`](super::ConnectionManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Initial value of the URL field.
    pub url: String,

    /// Opening handshake limit.
    pub connect_timeout: Duration,

    /// Wait for the peer's close frame after a local close.
    pub close_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with the default URL and timeouts.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the initial URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the close acknowledgement timeout.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ClientOptions {
    /// Returns the timeouts handed to each socket.
    #[inline]
    #[must_use]
    pub fn timeouts(&self) -> SocketTimeouts {
        SocketTimeouts {
            connect: self.connect_timeout,
            close: self.close_timeout,
        }
    }

    /// Checks the options for values the socket cannot work with.
    ///
    /// The URL is deliberately not checked here; a bad URL surfaces as a
    /// construction error on connect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be greater than zero"));
        }
        if self.close_timeout.is_zero() {
            return Err(Error::config("close timeout must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
