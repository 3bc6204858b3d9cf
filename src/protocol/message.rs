//! Transcript entries.
//!
//! Inbound payloads are decoded with a best-effort heuristic: anything that
//! parses as JSON becomes a structured value, everything else is kept as raw
//! text. Plain text that happens to be JSON (`42`, `true`, `"quoted"`) is
//! therefore reinterpreted as structured data.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// MessageEntry
// ============================================================================

/// One received message as it appears in the transcript.
///
/// # Serialized form
///
/// ```json
/// { "kind": "structured", "value": { "a": 1 } }
/// { "kind": "raw", "value": "hello" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MessageEntry {
    /// Payload that decoded as JSON.
    Structured(Value),
    /// Payload kept verbatim.
    Raw(String),
}

impl MessageEntry {
    /// Decodes an inbound text payload.
    #[must_use]
    pub fn decode(payload: &str) -> Self {
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Raw(payload.to_owned()),
        }
    }

    /// Returns `true` if the payload decoded as JSON.
    #[inline]
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Renders the entry for display.
    ///
    /// Objects and arrays are pretty-printed with two-space indentation.
    /// A decoded string shows its contents without quotes.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Raw(text) => text.clone(),
            Self::Structured(Value::String(text)) => text.clone(),
            Self::Structured(value @ (Value::Object(_) | Value::Array(_))) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::Structured(value) => value.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
