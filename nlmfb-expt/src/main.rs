//! nlmfb-expt - experiment web service
//!
//! Serves the passage comprehension experiment, stores participant data in
//! SQLite and exposes CSV downloads to administrators.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nlmfb_common::config::load_toml_config;
use nlmfb_common::db::init_database;
use nlmfb_common::StimulusSet;
use nlmfb_expt::db::admins::upsert_admin;
use nlmfb_expt::services::{CaptchaClient, MturkClient};
use nlmfb_expt::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for nlmfb-expt
#[derive(Parser, Debug)]
#[command(name = "nlmfb-expt")]
#[command(about = "NLM-FB passage comprehension experiment server")]
#[command(version)]
struct Args {
    /// TOML config file (default: ~/.config/nlmfb/config.toml)
    #[arg(short, long, env = "NLMFB_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "NLMFB_DATABASE")]
    database: Option<PathBuf>,

    /// Stimulus CSV
    #[arg(long, env = "NLMFB_STIMULI")]
    stimuli: Option<PathBuf>,

    /// Directory for raw results backups
    #[arg(long, env = "NLMFB_RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "NLMFB_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "NLMFB_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a superuser for data downloads, or reset their password
    CreateAdmin {
        #[arg(long)]
        username: String,

        #[arg(long, env = "NLMFB_ADMIN_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Read before tracing starts so the configured level applies
    let config = load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting NLM-FB experiment server (nlmfb-expt) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let database_path = args.database.unwrap_or(config.database_path.clone());
    info!("Database path: {}", database_path.display());
    let pool = init_database(&database_path)
        .await
        .context("Failed to initialize database")?;

    if let Some(Command::CreateAdmin { username, password }) = args.command {
        upsert_admin(&pool, &username, &password)
            .await
            .context("Failed to create admin")?;
        info!("Admin '{}' saved", username);
        return Ok(());
    }

    let stimuli_path = args.stimuli.unwrap_or(config.stimuli_path.clone());
    let stimuli = StimulusSet::load(&stimuli_path)
        .with_context(|| format!("Failed to load stimuli from {}", stimuli_path.display()))?;

    let captcha = CaptchaClient::new(
        config.captcha_verify_url.clone(),
        config.captcha_secret_key.clone(),
    )
    .context("Failed to create CAPTCHA client")?;
    if !captcha.is_configured() {
        warn!("No CAPTCHA secret configured; /validate_captcha/ will fail");
    }

    let mturk = MturkClient::new(&config.mturk).context("Failed to create MTurk client")?;
    if !mturk.is_configured() {
        warn!("No MTurk credentials configured; workers will not be credited");
    }

    let results_dir = args.results_dir.unwrap_or(config.results_dir.clone());
    info!("Results backups: {}", results_dir.display());

    let state = AppState::new(
        pool,
        stimuli,
        results_dir,
        captcha,
        mturk,
        config.captcha_site_key.clone(),
    );
    let app = build_router(state);

    let bind = args.bind.unwrap_or(config.bind_address.clone());
    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("nlmfb-expt listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
