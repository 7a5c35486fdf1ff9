//! parlo-demo - Pronunciation demo backend
//!
//! HTTP service behind the Parlo marketing site: demo access gating, mock
//! pronunciation scoring, lead capture, and the stubbed checkout.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parlo_common::config::{ensure_data_dir, resolve_data_dir};
use parlo_common::db::init_database;
use parlo_common::db::settings::DemoSettings;
use parlo_demo::{build_router, AppState};

/// Command-line arguments for parlo-demo
#[derive(Parser, Debug)]
#[command(name = "parlo-demo")]
#[command(about = "Pronunciation demo backend for the Parlo site")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "PARLO_PORT")]
    port: u16,

    /// Data directory holding the SQLite database
    #[arg(short, long, env = "PARLO_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlo_demo=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Parlo Demo Backend (parlo-demo) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let data_dir = resolve_data_dir(args.data_dir.as_deref(), "PARLO_DATA_DIR");
    let db_path = ensure_data_dir(&data_dir).context("Failed to prepare data directory")?;
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let settings = DemoSettings::load(&pool)
        .await
        .context("Failed to load demo settings")?;
    info!(
        "Demo settings: {} attempts per grant, {} hour sessions",
        settings.max_attempts, settings.session_hours
    );

    let state = AppState::new(pool, settings);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("parlo-demo listening on http://{}", addr);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
