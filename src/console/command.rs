//! Console input parsing.
//!
//! Lines starting with `/` are commands; everything else is a message to
//! send. A leading `//` escapes a literal slash.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// ConsoleCommand
// ============================================================================

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Blank line; ignored.
    Empty,
    /// Connect, optionally replacing the URL field first.
    Connect(Option<String>),
    /// Disconnect and reset the transcript.
    Disconnect,
    /// Send text verbatim.
    Send(String),
    /// Show or change the URL field.
    Url(Option<String>),
    /// Show status and the current error.
    Status,
    /// Show the transcript.
    Messages,
    /// Show command help.
    Help,
    /// Leave the console.
    Quit,
}

impl ConsoleCommand {
    /// Parses one input line (without its line terminator).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCommand`] for an unrecognized `/command`.
    pub fn parse(line: &str) -> Result<Self> {
        if line.trim().is_empty() {
            return Ok(Self::Empty);
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Send(line.to_owned()));
        };

        if rest.starts_with('/') {
            return Ok(Self::Send(rest.to_owned()));
        }

        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument),
            None => (rest, ""),
        };
        let trimmed = argument.trim();
        let optional = (!trimmed.is_empty()).then(|| trimmed.to_owned());

        match name {
            "connect" | "c" => Ok(Self::Connect(optional)),
            "disconnect" | "d" => Ok(Self::Disconnect),
            // the argument is sent as typed
            "send" | "s" => Ok(Self::Send(argument.to_owned())),
            "url" | "u" => Ok(Self::Url(optional)),
            "status" => Ok(Self::Status),
            "messages" | "m" => Ok(Self::Messages),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(Error::unknown_command(format!("/{name}"))),
        }
    }
}

/// Help text shown by `/help`.
pub const HELP: &str = "\
Commands:
  /connect [url]   connect (optionally to a new URL)
  /disconnect      close the connection and clear the transcript
  /send <text>     send text verbatim
  /url [url]       show or change the URL (not while connected)
  /status          show connection status and last error
  /messages        show received messages
  /help            show this help
  /quit            exit
Any other line is sent as a message; start it with // to send a leading /.";

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_are_empty() {
        assert_eq!(ConsoleCommand::parse("").unwrap(), ConsoleCommand::Empty);
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), ConsoleCommand::Empty);
    }

    #[test]
    fn test_plain_text_is_sent_verbatim() {
        assert_eq!(
            ConsoleCommand::parse(r#" {"a": 1} "#).unwrap(),
            ConsoleCommand::Send(r#" {"a": 1} "#.into())
        );
    }

    #[test]
    fn test_double_slash_escapes() {
        assert_eq!(
            ConsoleCommand::parse("//status").unwrap(),
            ConsoleCommand::Send("/status".into())
        );
    }

    #[test]
    fn test_connect_with_and_without_url() {
        assert_eq!(
            ConsoleCommand::parse("/connect").unwrap(),
            ConsoleCommand::Connect(None)
        );
        assert_eq!(
            ConsoleCommand::parse("/connect  ws://localhost:1/ws?peer_id ").unwrap(),
            ConsoleCommand::Connect(Some("ws://localhost:1/ws?peer_id".into()))
        );
    }

    #[test]
    fn test_send_keeps_argument_spacing() {
        assert_eq!(
            ConsoleCommand::parse("/send  two spaces").unwrap(),
            ConsoleCommand::Send(" two spaces".into())
        );
    }

    #[test]
    fn test_aliases() {
        assert_eq!(ConsoleCommand::parse("/d").unwrap(), ConsoleCommand::Disconnect);
        assert_eq!(ConsoleCommand::parse("/exit").unwrap(), ConsoleCommand::Quit);
        assert_eq!(ConsoleCommand::parse("/m").unwrap(), ConsoleCommand::Messages);
        assert_eq!(ConsoleCommand::parse("/?").unwrap(), ConsoleCommand::Help);
    }

    #[test]
    fn test_unknown_command() {
        let err = ConsoleCommand::parse("/frobnicate now").unwrap_err();
        assert!(matches!(err, Error::UnknownCommand { ref command } if command == "/frobnicate"));
    }
}
