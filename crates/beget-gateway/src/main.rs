//! Beget gateway: entry point.
//!
//! Loads the configuration, builds the producer for the configured mode and
//! serves the HTTP API until `SIGINT` or `SIGTERM`.
//!
//! # Configuration
//!
//! | Source | Example |
//! |--------|---------|
//! | `--config` / `BEGET_CONFIG` | `config.yaml` (default), `.toml` or `.json` |
//! | `BEGET_<SECTION>__<KEY>` | `BEGET_KAFKA__BROKERS=a:9092,b:9092` |
//! | `RUST_LOG` | overrides `log.level` |
//!
//! Exits with status 1 when startup fails, when in-flight requests outlive
//! the shutdown grace period, or when the producer fails to close.

use beget_gateway::server::{GatewayServer, shutdown_signal};
use beget_gateway::{logging, producer};
use beget_kernel::config;
use clap::Parser;
use eyre::WrapErr;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "beget-gateway", version, about = "HTTP gateway that publishes JSON events to Kafka")]
struct Cli {
    /// Configuration file (YAML, TOML or JSON).
    #[arg(short, long, env = "BEGET_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("beget-gateway: {e:?}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> eyre::Result<()> {
    let config = config::load(&cli.config)
        .wrap_err_with(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let config = Arc::new(config);

    logging::init(&config.log)?;
    info!(
        mode = %config.mode(),
        port = config.server.port,
        topics = ?config.kafka.topics,
        "beget gateway configuration loaded"
    );

    let producer = producer::connect(&config).wrap_err("failed to initialize producer")?;
    let server = GatewayServer::new(Arc::clone(&config), Arc::clone(&producer))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to listen on {addr}"))?;

    let served = server.serve(listener, shutdown_signal()).await;
    // Close the producer even when the drain failed.
    let closed = producer.close().await;

    served.wrap_err("server forced to shutdown")?;
    closed.wrap_err("failed to close producer")?;
    info!("server exiting");
    Ok(())
}
