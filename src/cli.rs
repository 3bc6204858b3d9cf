//! Command-line interface.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::client::{ClientOptions, DEFAULT_URL};
use crate::console::OutputFormat;

// ============================================================================
// Constants
// ============================================================================

/// Default port for `serve`, matching [`DEFAULT_URL`].
pub const DEFAULT_SERVE_PORT: u16 = 9999;

const LONG_ABOUT: &str = r#"ws-probe is a manual test client for WebSocket endpoints.

Enter a URL, connect, type messages to send them, and watch what the peer
sends back. Received messages that parse as JSON are pretty-printed.

CONSOLE:
    /connect [url]   connect (optionally to a new URL)
    /disconnect      close the connection and clear the transcript
    /messages        show received messages
    /help            list every command
    Any other line is sent verbatim.

EXAMPLES:
    # Start a local echo peer, then talk to it
    ws-probe serve --port 9999
    ws-probe --connect

    # Connect somewhere else, machine-readable output
    ws-probe -u wss://example.com/ws?peer_id=alice --connect --format json"#;

// ============================================================================
// Cli
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "ws-probe")]
#[command(author, version)]
#[command(about = "Interactive WebSocket test client")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// WebSocket URL to start with
    #[arg(short, long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Connect immediately instead of waiting for /connect
    #[arg(short, long)]
    pub connect: bool,

    /// Seconds allowed for the opening handshake
    #[arg(long, default_value_t = 30, value_name = "SECS")]
    pub connect_timeout: u64,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a local echo peer
    Serve {
        /// Address to bind
        #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
        bind: IpAddr,

        /// Port to listen on (0 picks a free port)
        #[arg(short, long, default_value_t = DEFAULT_SERVE_PORT)]
        port: u16,
    },
}

impl Cli {
    /// Builds client options from the flags.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::new()
            .with_url(self.url.clone())
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
    }

    /// Returns the default log filter.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "ws_probe=debug"
        } else {
            "ws_probe=info"
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
