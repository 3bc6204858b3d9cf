//! Connection management.
//!
//! The [`ConnectionManager`] is the one component with behavior: it owns
//! the active socket and republishes its lifecycle as [`ClientState`].
//!
//! # State Machine
//!
//! ```text
//!                 connect() + open event
//!   Disconnected ───────────────────────► Connected
//!        ▲                                    │
//!        └────── close | error | disconnect() ┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `manager` | [`ConnectionManager`] and [`Transition`] |
//! | `options` | [`ClientOptions`] |
//! | `state` | [`ConnectionState`] and [`ClientState`] |

// ============================================================================
// Submodules
// ============================================================================

/// Connection manager.
pub mod manager;

/// Client configuration.
pub mod options;

/// Observable client state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use manager::{CONNECTION_ERROR_MESSAGE, ConnectionManager, Transition, UNKNOWN_CLOSE_REASON};
pub use options::{ClientOptions, DEFAULT_URL};
pub use state::{ClientState, ConnectionState};
