//! SciX gateway
//!
//! An edge proxy in front of the scholarly search API that attaches the
//! service credential and caches successful read responses.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────┐
//!                     │                    GATEWAY                    │
//!                     │                                               │
//!   Client Request    │  ┌────────┐   ┌──────────┐   ┌────────────┐   │
//!   ──────────────────┼─▶│  http  │──▶│ security │──▶│   cache    │   │
//!                     │  │ server │   │  checks  │   │  lookup    │   │
//!                     │  └────────┘   └──────────┘   └─────┬──────┘   │
//!                     │                                hit │ miss     │
//!                     │                                    ▼          │
//!   Client Response   │  ┌──────────┐                ┌────────────┐   │
//!   ◀─────────────────┼──│ response │◀───────────────│  upstream  │◀──┼── Search API
//!                     │  └──────────┘   (cache write)└────────────┘   │
//!                     │                                               │
//!                     │  config · observability · lifecycle           │
//!                     └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use scix_gateway::config::load_config;
use scix_gateway::http::GatewayServer;
use scix_gateway::lifecycle::{startup, Shutdown};
use scix_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "scix-gateway")]
#[command(about = "Caching edge proxy for the scholarly search API", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "scix-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        cache_backend = ?config.cache.backend,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let handler = startup::build_handler(&config)?;
    let listener = startup::bind(&config).await?;

    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = GatewayServer::new(config, handler);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
