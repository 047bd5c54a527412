//! hrlb-server - HighRatings leaderboard microservice
//!
//! Serves ranked leaderboards of top-rated movies, TV shows, books and music
//! aggregated from TMDB, Google Books and Spotify.

use anyhow::{Context, Result};
use clap::Parser;
use hrlb_common::config::{load_config, ProviderCredentials, ServerSettings, SettingsOverrides};
use hrlb_server::adapters::books::BooksAdapter;
use hrlb_server::adapters::spotify::SpotifyAdapter;
use hrlb_server::adapters::tmdb::{MediaKind, TmdbAdapter};
use hrlb_server::adapters::token::TokenProvider;
use hrlb_server::adapters::{http_client, ContentAdapter};
use hrlb_server::interactions::{InteractionStore, MemoryInteractionStore, SqliteInteractionStore};
use hrlb_server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for hrlb-server
#[derive(Parser, Debug)]
#[command(name = "hrlb-server")]
#[command(about = "HighRatings leaderboard microservice")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "HRLB_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "HRLB_BIND_ADDRESS")]
    bind: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, env = "HRLB_LOG_LEVEL")]
    log_level: Option<String>,

    /// SQLite file for interactions (in-memory store when omitted)
    #[arg(long, env = "HRLB_INTERACTIONS_DB")]
    interactions_db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before the subscriber exists so its log level can apply
    let toml = load_config(args.config.as_deref()).context("Failed to load config")?;
    let overrides = SettingsOverrides {
        port: args.port,
        bind_address: args.bind,
        log_level: args.log_level,
        interactions_db: args.interactions_db,
    };
    let settings = ServerSettings::resolve(&overrides, &toml).context("Invalid settings")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    // Build identification first, before any network setup
    info!(
        "Starting HighRatings leaderboard (hrlb-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let credentials = ProviderCredentials::resolve(&toml);
    let missing = credentials.missing();
    if !missing.is_empty() {
        warn!(
            "Missing provider credentials: {} (affected categories will return errors)",
            missing.join(", ")
        );
    }

    let client = http_client(settings.upstream_timeout)?;

    let movies: Arc<dyn ContentAdapter> = Arc::new(TmdbAdapter::new(
        client.clone(),
        MediaKind::Movie,
        credentials.tmdb_access_token.clone(),
    ));
    let tv: Arc<dyn ContentAdapter> = Arc::new(TmdbAdapter::new(
        client.clone(),
        MediaKind::Tv,
        credentials.tmdb_access_token.clone(),
    ));
    let books = Arc::new(BooksAdapter::new(
        client.clone(),
        credentials.google_books_api_key.clone(),
    ));
    let tokens = TokenProvider::new(
        client.clone(),
        credentials.spotify_client_id.clone(),
        credentials.spotify_client_secret.clone(),
    );
    let music = Arc::new(SpotifyAdapter::new(client, tokens));

    let interactions: Arc<dyn InteractionStore> = match &settings.interactions_db {
        Some(path) => {
            info!("Interactions database: {}", path.display());
            match SqliteInteractionStore::connect(path).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to open interactions database: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            info!("Interactions kept in memory (no interactions_db configured)");
            Arc::new(MemoryInteractionStore::new())
        }
    };

    let state = AppState::new(settings.budgets, vec![movies, tv], books, music, interactions);
    let app = build_router(state);

    let addr = format!("{}:{}", settings.bind_address, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("hrlb-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

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
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
