//! Host-rewriting reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                    PROXY                     │
//!   Client Request   │  ┌──────────┐    ┌────────────┐              │
//!   ─────────────────┼─▶│  http    │───▶│ overrides  │── hit ──▶ local file
//!                    │  │dispatcher│    │  resolver  │              │
//!                    │  └──────────┘    └─────┬──────┘              │
//!                    │                        │ miss                │
//!                    │                        ▼                     │
//!                    │                 ┌─────────────┐   upstream   │
//!                    │                 │   proxy     │──────────────┼──▶ Origin
//!                    │                 │  pipeline   │◀─────────────┼───
//!   Client Response  │                 └─────┬───────┘              │
//!   ◀────────────────┼───── rewrite (hosts, location, HTML text) ◀──┘
//!                    │                                              │
//!                    │  config · observability · lifecycle          │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use doogle_proxy::http::HttpServer;
use doogle_proxy::lifecycle::{signals, startup, Shutdown, StartupError};
use doogle_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "doogle-proxy")]
#[command(about = "Host-rewriting reverse proxy", long_about = None)]
struct Args {
    /// TOML config file. Defaults apply when omitted; PORT always overrides the port.
    #[arg(short, long, env = "DOOGLE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = startup::load(args.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!("doogle-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstream = %config.upstream.domain,
        overrides = %config.overrides.directory.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr).map_err(StartupError::Metrics)?;
        }
    }

    let server = HttpServer::new(config)?;
    let listener = startup::bind(server.config()).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
