//! fpt-server - Feature Prioritization Tool service
//!
//! Resolves the recommendation matrix (remote store, then local cache, then
//! the embedded defaults) and serves recommendations over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fpt_common::config::{load_toml_config, Settings, SettingsOverrides};
use fpt_common::features::FeatureStore;
use fpt_common::store::{FileCache, ReconnectingStore, RemoteStore, UnconfiguredRemote};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fpt_server::{build_router, AppState};

/// Command-line arguments for fpt-server
#[derive(Parser, Debug)]
#[command(name = "fpt-server")]
#[command(about = "Feature Prioritization Tool service")]
#[command(version)]
struct Args {
    /// Root folder for the database and local cache
    #[arg(short, long, env = "FPT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Remote store URL, or "none" to run without one
    #[arg(long, env = "FPT_DATABASE_URL")]
    database_url: Option<String>,

    /// Address to listen on
    #[arg(short, long, env = "FPT_BIND")]
    bind: Option<String>,

    /// Admin password (empty disables the check)
    #[arg(long, env = "FPT_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Timeout for each remote store call, in milliseconds
    #[arg(long, env = "FPT_REMOTE_TIMEOUT_MS")]
    remote_timeout_ms: Option<u64>,

    /// Config file (defaults to ~/.config/fpt/config.toml)
    #[arg(short, long, env = "FPT_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            root_folder: self.root_folder.clone(),
            database_url: self.database_url.clone(),
            bind: self.bind.clone(),
            admin_password: self.admin_password.clone(),
            remote_timeout_ms: self.remote_timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so its log level applies; problems are
    // reported once the subscriber is up
    let (toml, config_error) = load_toml_config(args.config.as_deref());
    let settings = Settings::resolve(args.overrides(), &toml);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    info!(
        "Starting Feature Prioritization Tool (fpt-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(e) = config_error {
        warn!("Ignoring config file: {}", e);
    }
    info!("Root folder: {}", settings.root_folder.display());

    std::fs::create_dir_all(&settings.root_folder).with_context(|| {
        format!(
            "Failed to create root folder {}",
            settings.root_folder.display()
        )
    })?;

    let (remote, feature_store) = open_stores(&settings).await;
    let cache = Arc::new(FileCache::new(settings.cache_dir()));
    info!("Local cache: {}", cache.dir().display());

    if settings.admin_password.is_empty() {
        warn!("Admin password is empty; admin routes are unprotected");
    }

    let state = AppState::from_stores(
        remote,
        feature_store,
        cache,
        settings.remote_timeout,
        settings.admin_password.as_str(),
    );

    let resolution = state.matrix.refresh().await;
    info!(
        "Matrix loaded: {} rows from {}",
        resolution.rows.len(),
        resolution.source
    );
    if let Some(diagnostic) = &resolution.diagnostic {
        info!("Resolution notes: {}", diagnostic);
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind))?;
    info!("fpt-server listening on http://{}", settings.bind);
    info!("Health check: http://{}/health", settings.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Remote matrix store and feature store over the configured database.
/// A database that cannot be opened yet leaves the service on cache and
/// embedded data until a later call manages to open it.
async fn open_stores(settings: &Settings) -> (Arc<dyn RemoteStore>, Arc<dyn FeatureStore>) {
    let Some(url) = &settings.database_url else {
        info!("Remote store disabled");
        return (Arc::new(UnconfiguredRemote), Arc::new(UnconfiguredRemote));
    };

    let store = Arc::new(ReconnectingStore::new(url.as_str()));
    if let Err(e) = store.connect().await {
        warn!("Remote store unavailable ({}); retrying on each request", e);
    }

    let remote: Arc<dyn RemoteStore> = store.clone();
    (remote, store)
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
                warn!("Failed to install terminate handler: {}", e);
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
