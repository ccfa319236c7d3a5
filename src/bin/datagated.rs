//! datagated: Datagate daemon.
//!
//! Serves the operations declared in the config file over HTTP, behind the
//! gateway's rate limit and result cache.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use datagate::Datagate;
use datagate::server::config::Config;

/// Datagate daemon: rate-limited, caching data gateway.
#[derive(Parser)]
#[command(name = "datagated")]
#[command(version = datagate::PKG_VERSION)]
#[command(about = "Datagate invocation gateway daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "DATAGATE_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Address to bind to (overrides `[server] address`).
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info for the daemon; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration, then let the environment override it
    let mut config = Config::load(args.config.as_deref())?;
    config.gateway.apply_env()?;

    let registry = config.registry();
    let operation_count = registry.len();
    let gateway = Datagate::builder()
        .provider(registry)
        .config(&config.gateway)
        .build()?;

    let address = args.address.unwrap_or_else(|| config.server.address.clone());
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| datagate::GatewayError::Configuration(format!("Invalid address: {e}")))?;

    info!(
        version = datagate::PKG_VERSION,
        %addr,
        operations = operation_count,
        max_requests = config.gateway.rate_limit_max_requests,
        window_secs = config.gateway.rate_limit_window_seconds,
        cache = config.gateway.cache_enable,
        "datagated starting"
    );

    let app = datagate::server::router(Arc::new(gateway), config.server.request_timeout());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("datagated stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
