//! upstream-relay
//!
//! Forwards every inbound HTTP request, and every upgraded (WebSocket)
//! connection, to one configured upstream origin.
//!
//! ```text
//!     Client ──▶ listener ──▶ relay ──┬─▶ HTTP forward ──▶ Upstream
//!                                     └─▶ upgrade splice ◀─▶ Upstream
//! ```

use std::process::ExitCode;

use clap::Parser;

use upstream_relay::config::ProxyConfig;
use upstream_relay::http::HttpServer;
use upstream_relay::lifecycle::{signals, Shutdown};
use upstream_relay::net::Listener;
use upstream_relay::observability::logging;

#[derive(Parser)]
#[command(name = "upstream-relay", version)]
#[command(about = "Reverse proxy forwarding HTTP and WebSocket traffic to one upstream", long_about = None)]
struct Cli {
    /// Upstream URL; the TARGET environment variable takes precedence.
    target: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let config = match ProxyConfig::from_env(cli.target) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind_address = config.listener.bind_address;
    let server = HttpServer::new(config)?;

    let listener = Listener::bind(bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        upstream = %server.target(),
        "Proxy running on http://localhost:{} -> {}",
        local_addr.port(),
        server.target()
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;
    Ok(())
}
