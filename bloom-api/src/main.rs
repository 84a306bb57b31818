//! bloom-api - Curriculum service entry point
//!
//! Turns uploaded textbooks into chapter/lesson/quiz curricula and serves the
//! teacher, student and subject records around them.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use bloom_api::blob::LocalBlobStore;
use bloom_api::config::{migrate_key_to_database, resolve_completion_api_key, GenerationSettings};
use bloom_api::AppState;
use bloom_common::config::{
    load_toml_config_or_default, LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for bloom-api
#[derive(Parser, Debug)]
#[command(name = "bloom-api")]
#[command(about = "Curriculum generation service for bloom")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5780", env = "BLOOM_PORT")]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1", env = "BLOOM_BIND")]
    bind: String,

    /// Root folder holding the database and blob store
    #[arg(short, long, env = "BLOOM_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new("bloom").with_cli_arg(args.root_folder.clone());
    let config_path = resolver.config_path();
    let toml_config = config_path
        .as_deref()
        .map(load_toml_config_or_default)
        .unwrap_or_else(TomlConfig::default);

    init_tracing(&toml_config.logging)?;

    info!(
        "Starting bloom-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Root folder and database
    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = bloom_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let settings = GenerationSettings::load(&db)
        .await
        .context("Failed to load generation settings")?;
    info!(
        model = %settings.completion_model,
        chunk_max_chars = settings.chunk_max_chars,
        ordering = %settings.chapter_ordering,
        "Generation settings loaded"
    );

    let blobs = Arc::new(LocalBlobStore::new(initializer.blob_path()));
    info!("Blob store: {}", blobs.root().display());
    let mut state = AppState::new(db.clone(), blobs, settings);
    if let Some(path) = config_path.clone() {
        state = state.with_toml_path(path);
    }

    // Completion key; the service starts degraded without one
    match resolve_completion_api_key(&db, &toml_config).await {
        Ok((key, source)) => {
            if let Err(e) = migrate_key_to_database(&key, source, &db, config_path.as_deref()).await {
                warn!("Failed to migrate completion API key to database: {}", e);
            }
            state
                .install_api_key(key)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
        Err(e) => {
            warn!("{}", e);
            warn!("Uploads will fail until a completion API key is configured");
        }
    }

    let app = bloom_api::build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.bind, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins over the TOML level; a TOML log file replaces stderr
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &logging.level;
        format!("bloom_api={level},bloom_common={level},tower_http={level}").into()
    });

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
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
