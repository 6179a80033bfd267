//! wqi-server - live water quality index service
//!
//! Loads the rule table and the trained model artifact (fatal if absent),
//! wires the acquisition cascade and serves the HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wqi_common::config::{self, RootLayout};
use wqi_server::acquisition::{self, AcquisitionService, LiveTierSettings};
use wqi_server::config::ServerConfig;
use wqi_server::log::PersistenceLog;
use wqi_server::{build_router, AppState};

/// Command-line arguments for wqi-server
#[derive(Parser, Debug)]
#[command(name = "wqi-server")]
#[command(about = "Water quality index estimation service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder for the model artifact and persistence log
    #[arg(short, long, env = "WQI_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides `[server] port`)
    #[arg(short, long, env = "WQI_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let config: ServerConfig = config::load_toml(config_path.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{},tower_http=info", config.common.logging.level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting wqi-server v{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    );

    let root = config::resolve_root_folder(args.root_folder.as_deref(), config.common.root_folder.as_deref());
    let layout = RootLayout::new(root);
    layout.ensure_directories().context("Failed to create root folder layout")?;
    info!("Root folder: {}", layout.root().display());

    // Validates rule overrides even though serving goes through the model
    config.common.rule_table().context("Invalid rule table")?;

    let model_path = config.server.model_path.clone().unwrap_or_else(|| layout.model_path());
    let model = wqi_model::artifact::load(&model_path).with_context(|| {
        format!(
            "Failed to load model artifact {} (run `wqi-model train` first)",
            model_path.display()
        )
    })?;

    let log_path = config.server.log_path.clone().unwrap_or_else(|| layout.readings_log_path());
    info!("Persistence log: {}", log_path.display());

    let source = acquisition::source_from_config(&config.remote).context("Failed to build remote source")?;
    if !config.prediction.is_identity() {
        info!(
            "Calibration enabled: {} * wqi + {}",
            config.prediction.calibration_scale, config.prediction.calibration_offset
        );
    }

    let service = AcquisitionService::new(
        source,
        LiveTierSettings::from(&config.remote),
        PersistenceLog::new(log_path),
        Arc::new(model),
        config.prediction,
        config.simulation.seed,
    );
    let app = build_router(AppState::new(Arc::new(service), true));

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid [server] host '{}'", config.server.host))?;
    let addr = SocketAddr::new(host, args.port.unwrap_or(config.server.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
