//! Console output.
//!
//! Every line the console prints goes through [`Renderer::line`], either as
//! human-readable text or as one JSON object per line.

// ============================================================================
// Imports
// ============================================================================

use clap::ValueEnum;
use serde::Serialize;

use crate::client::ConnectionState;
use crate::error::Result;
use crate::protocol::{CloseInfo, MessageEntry};

// ============================================================================
// Constants
// ============================================================================

/// Shown in place of an empty transcript.
pub const EMPTY_TRANSCRIPT: &str = "No messages received yet.";

// ============================================================================
// OutputFormat
// ============================================================================

/// How console output is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

// ============================================================================
// Output
// ============================================================================

/// Something the console shows.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Output<'a> {
    /// Connection state.
    Status {
        /// Current state.
        status: ConnectionState,
    },
    /// Error state.
    Error {
        /// Error message.
        message: &'a str,
    },
    /// A received message.
    Message {
        /// The transcript entry.
        entry: &'a MessageEntry,
    },
    /// The whole transcript.
    Transcript {
        /// Entries in arrival order.
        messages: &'a [MessageEntry],
    },
    /// Connection finished.
    Close {
        /// Close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: &'a str,
        /// Whether the closing handshake completed.
        was_clean: bool,
    },
    /// Outbound text queued.
    Sent {
        /// The text as sent.
        text: &'a str,
    },
    /// Informational note.
    Info {
        /// Note text.
        message: &'a str,
    },
}

impl<'a> Output<'a> {
    /// Builds a close output from close details.
    #[must_use]
    pub fn close(info: &'a CloseInfo) -> Self {
        Self::Close {
            code: info.code,
            reason: &info.reason,
            was_clean: info.was_clean,
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Formats [`Output`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    /// Creates a renderer for the given format.
    #[inline]
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Renders one output. Text may span several lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if JSON encoding fails.
    pub fn line(&self, output: &Output<'_>) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(output)?),
            OutputFormat::Text => Ok(text(output)),
        }
    }
}

fn text(output: &Output<'_>) -> String {
    match output {
        Output::Status { status } => format!("Status: {status}"),
        Output::Error { message } => format!("Error: {message}"),
        Output::Message { entry } => entry.render(),
        Output::Transcript { messages } if messages.is_empty() => {
            format!("Received Messages:\n{EMPTY_TRANSCRIPT}")
        }
        Output::Transcript { messages } => {
            let mut out = String::from("Received Messages:");
            for entry in *messages {
                out.push('\n');
                out.push_str(&entry.render());
            }
            out
        }
        Output::Close {
            code,
            reason,
            was_clean,
        } => {
            let kind = if *was_clean { "clean" } else { "unclean" };
            if reason.is_empty() {
                format!("Closed ({kind}, code {code})")
            } else {
                format!("Closed ({kind}, code {code}): {reason}")
            }
        }
        Output::Sent { text } => format!("> {text}"),
        Output::Info { message } => (*message).to_owned(),
    }
}

// ============================================================================
// Tests
// ============================================================================
