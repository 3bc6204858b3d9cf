//! `ws-probe` binary: interactive console, or a local echo peer.

use std::io;
use std::net::IpAddr;

use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ws_probe::cli::{Cli, Commands};
use ws_probe::{Console, ConnectionManager, PeerServer, Renderer, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter());

    match cli.command {
        Some(Commands::Serve { bind, port }) => serve(bind, port).await,
        None => run_console(&cli).await,
    }
}

/// Initialize tracing/logging. Logs go to stderr; stdout is the transcript.
fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn run_console(cli: &Cli) -> Result<()> {
    let options = cli.client_options();
    options.validate()?;

    let manager = ConnectionManager::new(options);
    let mut console = Console::new(manager, Renderer::new(cli.format), io::stdout());

    if cli.connect {
        console.connect()?;
    }

    console.run(BufReader::new(tokio::io::stdin())).await
}

async fn serve(bind: IpAddr, port: u16) -> Result<()> {
    let server = PeerServer::bind(bind, port).await?;
    info!(url = %server.ws_url(), "Connect with ?peer_id=<id> to be identified");

    tokio::select! {
        result = server.serve_echo() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
