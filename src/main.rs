//! Gateway engine binary.
//!
//! # Startup order
//!
//! ```text
//! logging → config → telemetry → engine → listener → serve
//!                                                      │
//! telemetry stop ◀── server drained ◀── SIGTERM/SIGINT ┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use gateway_engine::config::load_config;
use gateway_engine::lifecycle::signals::shutdown_on_signal;
use gateway_engine::observability::{logging, metrics, Telemetry, TRACE_SERVICE_NAME};
use gateway_engine::{EngineOptions, GatewayEngineFactory, GatewayServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "gateway-engine", version, about = "API gateway engine")]
struct Cli {
    /// Service configuration file (.toml or .json).
    #[arg(short, long)]
    config: PathBuf,

    /// Validate the configuration and compose the engine, then exit.
    #[arg(long)]
    check: bool,

    /// Log level used when RUST_LOG is not set.
    #[arg(long)]
    log_level: Option<String>,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    tracing::info!("gateway-engine v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli.config)?;
    tracing::info!(
        path = %cli.config.display(),
        service = %config.name,
        port = config.port,
        endpoints = config.endpoints.len(),
        "Configuration loaded"
    );

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let telemetry = Telemetry::start(TRACE_SERVICE_NAME);
    let options = EngineOptions::new(telemetry.handle());
    let bind_address = config.bind_address();
    let server = GatewayServer::new(&GatewayEngineFactory::new(), config, options)?;

    if cli.check {
        tracing::info!(
            capabilities = ?server.engine().capabilities(),
            "Configuration OK"
        );
        return Ok(());
    }

    let listener = TcpListener::bind(&bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move { shutdown_on_signal(&shutdown).await });

    server.run(listener, server_shutdown).await?;

    drop(telemetry);
    tracing::info!("Shutdown complete");
    Ok(())
}
