//! School health records server - entry point
//!
//! Starts the HTTP API and the scheduled maintenance jobs.

use anyhow::Context;
use clap::Parser;
use school_health::{api::create_router, config::Config, jobs, logging, state::AppState};
use tokio::sync::watch;

#[derive(Debug, Parser)]
#[command(name = "school-health-server", version, about)]
struct Cli {
    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,

    /// Start without the scheduled maintenance jobs
    #[arg(long)]
    no_maintenance: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    if cli.check_config {
        println!("Configuration OK");
        return Ok(());
    }
    if cli.no_maintenance {
        config.maintenance.enabled = false;
    }

    let _log_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.logging.deployment_environment,
        storage = ?config.storage.backend,
        "Starting school health server"
    );

    let addr = config
        .socket_addr()
        .context("Failed to determine socket address")?;
    let maintenance = config.maintenance.clone();

    let state = AppState::new(config)
        .await
        .context("Failed to initialize application state")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job_handles = jobs::spawn_maintenance(&state, &maintenance, shutdown_rx)
        .context("Failed to start scheduled maintenance")?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = shutdown_tx.send(true);
    for handle in job_handles {
        if let Err(e) = handle.await {
            tracing::warn!("Maintenance job task ended abnormally: {}", e);
        }
    }

    if let Err(e) = served {
        tracing::error!(error = %e, "Server terminated unexpectedly");
        return Err(e.into());
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, starting graceful shutdown...");
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, starting graceful shutdown...");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
