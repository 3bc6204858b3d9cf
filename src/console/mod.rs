//! Interactive terminal surface.
//!
//! The console plays the role of a form: a URL field, a connect/disconnect
//! toggle, an outgoing message line and a read-only transcript. It reads
//! input lines and socket transitions on one event loop and renders state
//! changes as they happen.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | [`ConsoleCommand`] line parsing |
//! | `render` | [`Renderer`] text/JSON output |

// ============================================================================
// Submodules
// ============================================================================

/// Console input parsing.
pub mod command;

/// Console output.
pub mod render;

// ============================================================================
// Imports
// ============================================================================

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::client::{ConnectionManager, Transition};
use crate::error::Result;

pub use command::{ConsoleCommand, HELP};
pub use render::{Output, OutputFormat, Renderer};

// ============================================================================
// Flow
// ============================================================================

/// Whether the console keeps running after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading input.
    Continue,
    /// Leave the loop.
    Quit,
}

// ============================================================================
// Console
// ============================================================================

/// Line-oriented front end over a [`ConnectionManager`].
pub struct Console<W: Write> {
    manager: ConnectionManager,
    /// Contents of the URL field.
    url: String,
    renderer: Renderer,
    out: W,
}

impl<W: Write> Console<W> {
    /// Creates a console. The URL field starts at the manager's configured URL.
    pub fn new(manager: ConnectionManager, renderer: Renderer, out: W) -> Self {
        let url = manager.options().url.clone();
        Self {
            manager,
            url,
            renderer,
            out,
        }
    }

    /// Returns the URL field.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the underlying manager.
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Returns the output sink.
    #[inline]
    #[must_use]
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Connects to the URL field.
    pub fn connect(&mut self) -> Result<()> {
        match self.manager.connect(&self.url) {
            Ok(()) => {
                let note = format!("Connecting to {}", self.url);
                self.emit(&Output::Info { message: &note })
            }
            Err(e) if e.is_construction_error() => {
                debug!(error = %e, "Connect failed");
                self.emit_error()?;
                self.emit_status()
            }
            Err(e) => Err(e),
        }
    }

    /// Handles one input line.
    pub fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let command = match ConsoleCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                let note = e.to_string();
                self.emit(&Output::Info { message: &note })?;
                return Ok(Flow::Continue);
            }
        };

        match command {
            ConsoleCommand::Empty => {}

            ConsoleCommand::Connect(url) => {
                if let Some(url) = url {
                    self.url = url;
                }
                self.connect()?;
            }

            ConsoleCommand::Disconnect => {
                self.manager.disconnect();
                self.emit_status()?;
            }

            ConsoleCommand::Send(text) => self.send(text)?,

            ConsoleCommand::Url(None) => {
                let note = format!("URL: {}", self.url);
                self.emit(&Output::Info { message: &note })?;
            }

            ConsoleCommand::Url(Some(url)) => {
                if self.manager.is_connected() {
                    self.emit(&Output::Info {
                        message: "The URL cannot be changed while connected.",
                    })?;
                } else {
                    self.url = url;
                    let note = format!("URL: {}", self.url);
                    self.emit(&Output::Info { message: &note })?;
                }
            }

            ConsoleCommand::Status => {
                self.emit_status()?;
                self.emit_error()?;
            }

            ConsoleCommand::Messages => {
                let messages = self.manager.state().messages();
                let line = self.renderer.line(&Output::Transcript { messages })?;
                self.write_line(&line)?;
            }

            ConsoleCommand::Help => self.emit(&Output::Info { message: HELP })?,

            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    /// Renders one socket transition.
    pub fn handle_transition(&mut self, transition: &Transition) -> Result<()> {
        match transition {
            Transition::Opened => self.emit_status(),
            Transition::Received(entry) => self.emit(&Output::Message { entry }),
            Transition::Errored(_) => {
                self.emit_error()?;
                self.emit_status()
            }
            Transition::Closed(info) => {
                self.emit(&Output::close(info))?;
                self.emit_error()?;
                self.emit_status()
            }
        }
    }

    /// Waits for the next socket transition and renders it.
    pub async fn step(&mut self) -> Result<Transition> {
        let transition = self.manager.recv().await?;
        self.handle_transition(&transition)?;
        Ok(transition)
    }

    /// Runs until `/quit` or end of input, then disconnects.
    pub async fn run<R>(mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.emit_status()?;
        let mut lines = input.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if self.handle_line(&line)? == Flow::Quit {
                                break;
                            }
                        }
                        None => {
                            debug!("Input closed");
                            break;
                        }
                    }
                }

                transition = self.manager.recv() => {
                    self.handle_transition(&transition?)?;
                }
            }
        }

        self.manager.disconnect();
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<()> {
        // empty messages never reach the manager
        if text.is_empty() {
            return Ok(());
        }

        self.manager.stage(text.clone());
        match self.manager.send_pending() {
            Ok(true) => self.emit(&Output::Sent { text: &text }),
            Ok(false) => Ok(()),
            Err(e) if e.is_connection_error() => self.emit_error(),
            Err(e) => Err(e),
        }
    }

    fn emit_status(&mut self) -> Result<()> {
        let status = self.manager.status();
        self.emit(&Output::Status { status })
    }

    fn emit_error(&mut self) -> Result<()> {
        match self.manager.state().error() {
            Some(message) => {
                let line = self.renderer.line(&Output::Error { message })?;
                self.write_line(&line)
            }
            None => Ok(()),
        }
    }

    fn emit(&mut self, output: &Output<'_>) -> Result<()> {
        let line = self.renderer.line(output)?;
        self.write_line(&line)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::client::{ClientOptions, ConnectionState};
    use crate::transport::PeerServer;

    fn console(url: &str) -> Console<Vec<u8>> {
        let manager = ConnectionManager::new(ClientOptions::new().with_url(url));
        Console::new(manager, Renderer::default(), Vec::new())
    }

    fn printed(console: &Console<Vec<u8>>) -> String {
        String::from_utf8_lossy(console.output()).into_owned()
    }

    async fn step(console: &mut Console<Vec<u8>>) -> Transition {
        timeout(Duration::from_secs(5), console.step())
            .await
            .expect("transition within timeout")
            .expect("event channel open")
    }

    #[test]
    fn test_url_field_defaults_to_options() {
        let console = console("ws://127.0.0.1:1/ws?peer_id");
        assert_eq!(console.url(), "ws://127.0.0.1:1/ws?peer_id");
    }

    #[test]
    fn test_send_while_disconnected_prints_error() {
        let mut console = console("ws://127.0.0.1:1/ws");
        assert_eq!(console.handle_line("hello").unwrap(), Flow::Continue);
        assert!(printed(&console).contains("Error: Cannot send message: WebSocket is not connected."));
    }

    #[test]
    fn test_empty_line_is_ignored() {
        let mut console = console("ws://127.0.0.1:1/ws");
        console.handle_line("").unwrap();
        assert!(printed(&console).is_empty());
        assert!(console.manager().state().error().is_none());
    }

    #[test]
    fn test_unknown_command_is_reported() {
        let mut console = console("ws://127.0.0.1:1/ws");
        console.handle_line("/bogus").unwrap();
        assert!(printed(&console).contains("Unknown command: /bogus"));
    }

    #[test]
    fn test_quit() {
        let mut console = console("ws://127.0.0.1:1/ws");
        assert_eq!(console.handle_line("/quit").unwrap(), Flow::Quit);
    }

    #[test]
    fn test_messages_when_empty() {
        let mut console = console("ws://127.0.0.1:1/ws");
        console.handle_line("/messages").unwrap();
        assert!(printed(&console).contains("No messages received yet."));
    }

    #[tokio::test]
    async fn test_connect_invalid_url_prints_error() {
        let mut console = console("ftp://example.com");
        console.handle_line("/connect").unwrap();

        let out = printed(&console);
        assert!(out.contains("Error: Invalid WebSocket URL"));
        assert!(out.contains("Status: Disconnected"));
    }

    #[tokio::test]
    async fn test_session_against_peer() {
        let server = PeerServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let mut console = console("ws://127.0.0.1:1/unused");

        console
            .handle_line(&format!("/connect {}?peer_id=probe", server.ws_url()))
            .unwrap();
        let mut peer = server.accept().await.expect("accept");
        assert_eq!(peer.peer_id().as_deref(), Some("probe"));
        assert_eq!(step(&mut console).await, Transition::Opened);

        // URL field is locked while connected
        console.handle_line("/url ws://elsewhere/ws").unwrap();
        assert!(console.url().ends_with("?peer_id=probe"));

        console.handle_line(r#"{"ping":true}"#).unwrap();
        assert_eq!(
            peer.recv_text().await.unwrap().as_deref(),
            Some(r#"{"ping":true}"#)
        );

        peer.send_text(r#"{"pong":true}"#).await.unwrap();
        step(&mut console).await;

        peer.abort();
        step(&mut console).await;

        let out = printed(&console);
        assert!(out.contains("Status: Connected"));
        assert!(out.contains(r#"> {"ping":true}"#));
        assert!(out.contains("{\n  \"pong\": true\n}"));
        assert!(out.contains("Error: Connection closed unexpectedly: Unknown reason"));
        assert_eq!(console.manager().status(), ConnectionState::Disconnected);

        // transcript still inspectable after the close
        assert_eq!(console.manager().state().messages().len(), 1);
        console.handle_line("/disconnect").unwrap();
        assert!(console.manager().state().messages().is_empty());
    }

    #[tokio::test]
    async fn test_url_editable_while_connecting() {
        let server = PeerServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let mut console = console(&server.ws_url());

        // never accepted, so the socket stays in its handshake
        console.handle_line("/connect").unwrap();
        assert!(console.manager().has_active_socket());
        assert!(!console.manager().is_connected());

        console.handle_line("/url ws://127.0.0.1:2/ws").unwrap();
        assert_eq!(console.url(), "ws://127.0.0.1:2/ws");
    }

    #[tokio::test]
    async fn test_run_until_quit() {
        let console = console("ws://127.0.0.1:1/ws");
        let input: &[u8] = b"/status\n/url\n/quit\nignored\n";

        console.run(input).await.expect("run");
    }

    #[tokio::test]
    async fn test_run_ends_on_eof() {
        let mut out = Vec::new();
        {
            let manager = ConnectionManager::new(ClientOptions::default());
            let console = Console::new(manager, Renderer::new(OutputFormat::Json), &mut out);
            let input: &[u8] = b"/status\n";
            console.run(input).await.expect("run");
        }

        let text = String::from_utf8(out).unwrap();
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first["event"], "status");
        assert_eq!(first["status"], "disconnected");
    }
}
