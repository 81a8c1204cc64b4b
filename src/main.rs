//! Usuarios gateway - REST facade over the users GraphQL API
//!
//! Module structure:
//! - `domain/` - Request, user and error types
//! - `io/` - HTTP server, ViaCEP and GraphQL clients, Prometheus text
//! - `services/` - Operation handlers and GraphQL documents
//! - `infra/` - Config, Metrics

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use usuarios_gateway::infra::{Config, Metrics};
use usuarios_gateway::services::GatewayHandler;

/// Usuarios gateway - REST to GraphQL translation for the users API
#[derive(Parser, Debug)]
#[command(name = "usuarios-gateway", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Default: INFO, use RUST_LOG=debug for per-request and upstream call events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = env!("GIT_HASH"), "usuarios-gateway starting");

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        graphql_url = %config.graphql_url(),
        postal_url_template = %config.postal_url_template(),
        backend_timeout = ?config.backend_timeout(),
        postal_timeout = ?config.postal_timeout(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());
    let gateway = Arc::new(GatewayHandler::new(&config, metrics.clone())?);

    // Periodic metrics log line (interval 0 disables)
    let metrics_interval = config.metrics_interval_secs();
    if metrics_interval > 0 {
        let reporter_metrics = metrics.clone();
        let mut reporter_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
            // First tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => reporter_metrics.report().log(),
                    _ = reporter_shutdown.changed() => break,
                }
            }
        });
    }

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    usuarios_gateway::io::start_server(&config, gateway, metrics.clone(), shutdown_rx).await?;

    metrics.report().log();
    info!("usuarios-gateway shutdown complete");
    Ok(())
}
