//! Configuration loading and settings resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service logs a warning and
//! starts on defaults. A TOML file that exists but does not parse is.

use crate::{Category, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5730;

/// Default bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Default per-request timeout for upstream calls
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "HRLB_CONFIG";

pub const TMDB_TOKEN_ENV: &str = "TMDB_ACCESS_TOKEN";
pub const GOOGLE_BOOKS_KEY_ENV: &str = "GOOGLE_BOOKS_API_KEY";
pub const SPOTIFY_CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";
pub const SPOTIFY_CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change while the service runs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// HTTP bind address
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Timeout applied to every upstream request
    #[serde(default)]
    pub upstream_timeout_secs: Option<u64>,

    /// SQLite file for the interaction document store (in-memory if absent)
    #[serde(default)]
    pub interactions_db: Option<PathBuf>,

    #[serde(default)]
    pub tmdb_access_token: Option<String>,

    #[serde(default)]
    pub google_books_api_key: Option<String>,

    #[serde(default)]
    pub spotify_client_id: Option<String>,

    #[serde(default)]
    pub spotify_client_secret: Option<String>,

    /// Upstream fetch budgets per category
    #[serde(default)]
    pub pipeline: PipelineBudgets,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// How much upstream data one aggregation may pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineBudgets {
    /// TMDB discover pages for movies
    #[serde(default = "default_tmdb_pages")]
    pub movie_pages: usize,
    /// TMDB discover pages for TV
    #[serde(default = "default_tmdb_pages")]
    pub tv_pages: usize,
    /// Google Books pages (20 volumes each) per subject query
    #[serde(default = "default_book_pages")]
    pub book_pages: usize,
    /// Spotify new-release batch size (Spotify caps this at 50)
    #[serde(default = "default_music_batch")]
    pub music_batch: usize,
}

impl Default for PipelineBudgets {
    fn default() -> Self {
        Self {
            movie_pages: default_tmdb_pages(),
            tv_pages: default_tmdb_pages(),
            book_pages: default_book_pages(),
            music_batch: default_music_batch(),
        }
    }
}

impl PipelineBudgets {
    /// Budget handed to the adapter serving `category`
    pub fn for_category(&self, category: Category) -> usize {
        match category {
            Category::Movie => self.movie_pages,
            Category::Tv => self.tv_pages,
            Category::Book => self.book_pages,
            Category::Music => self.music_batch,
        }
    }
}

fn default_tmdb_pages() -> usize {
    5
}

fn default_book_pages() -> usize {
    1
}

fn default_music_batch() -> usize {
    50
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Default config file location (`~/.config/hrlb/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hrlb").join("config.toml"))
}

/// Locate and load the TOML config
///
/// Explicit path (CLI) → `HRLB_CONFIG` → platform default. Missing files
/// fall back to [`TomlConfig::default`].
pub fn load_config(cli_path: Option<&Path>) -> Result<TomlConfig> {
    let path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .or_else(default_config_path);

    match path {
        Some(path) if path.exists() => {
            info!("Loading config from {}", path.display());
            TomlConfig::load(&path)
        }
        Some(path) => {
            warn!("Config file not found at {}, using defaults", path.display());
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Validate a secret value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve one secret from ENV then TOML
///
/// Blank values count as absent. Warns when both sources carry a value.
pub fn resolve_secret(name: &str, env_var: &str, toml_value: Option<&String>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v)).cloned();

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in environment and TOML config. Using environment (highest priority).",
            name
        );
    }

    match (env_value, toml_value) {
        (Some(v), _) => {
            info!("{} loaded from environment variable", name);
            Some(v)
        }
        (None, Some(v)) => {
            info!("{} loaded from TOML config", name);
            Some(v)
        }
        (None, None) => None,
    }
}

/// Upstream provider credentials
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub tmdb_access_token: Option<String>,
    pub google_books_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

// Secrets never reach the logs
impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ProviderCredentials")
            .field("tmdb_access_token", &mask(&self.tmdb_access_token))
            .field("google_books_api_key", &mask(&self.google_books_api_key))
            .field("spotify_client_id", &mask(&self.spotify_client_id))
            .field("spotify_client_secret", &mask(&self.spotify_client_secret))
            .finish()
    }
}

impl ProviderCredentials {
    pub fn resolve(toml: &TomlConfig) -> Self {
        Self {
            tmdb_access_token: resolve_secret(
                "TMDB access token",
                TMDB_TOKEN_ENV,
                toml.tmdb_access_token.as_ref(),
            ),
            google_books_api_key: resolve_secret(
                "Google Books API key",
                GOOGLE_BOOKS_KEY_ENV,
                toml.google_books_api_key.as_ref(),
            ),
            spotify_client_id: resolve_secret(
                "Spotify client id",
                SPOTIFY_CLIENT_ID_ENV,
                toml.spotify_client_id.as_ref(),
            ),
            spotify_client_secret: resolve_secret(
                "Spotify client secret",
                SPOTIFY_CLIENT_SECRET_ENV,
                toml.spotify_client_secret.as_ref(),
            ),
        }
    }

    /// Names of the environment variables whose secret is missing
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.tmdb_access_token.is_none() {
            missing.push(TMDB_TOKEN_ENV);
        }
        if self.google_books_api_key.is_none() {
            missing.push(GOOGLE_BOOKS_KEY_ENV);
        }
        if self.spotify_client_id.is_none() {
            missing.push(SPOTIFY_CLIENT_ID_ENV);
        }
        if self.spotify_client_secret.is_none() {
            missing.push(SPOTIFY_CLIENT_SECRET_ENV);
        }
        missing
    }
}

/// Values supplied on the command line (clap also folds in ENV for these)
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
    pub interactions_db: Option<PathBuf>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub upstream_timeout: Duration,
    pub interactions_db: Option<PathBuf>,
    pub budgets: PipelineBudgets,
}

impl ServerSettings {
    pub fn resolve(overrides: &SettingsOverrides, toml: &TomlConfig) -> Result<Self> {
        let port = overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT);

        let timeout_secs = toml
            .upstream_timeout_secs
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config(
                "upstream_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address: overrides
                .bind_address
                .clone()
                .or_else(|| toml.bind_address.clone())
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port,
            log_level: overrides
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
            upstream_timeout: Duration::from_secs(timeout_secs),
            interactions_db: overrides
                .interactions_db
                .clone()
                .or_else(|| toml.interactions_db.clone()),
            budgets: toml.pipeline,
        })
    }
}
