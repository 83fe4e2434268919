use anyhow::Result;
use moka::future::Cache;
use sea_orm::{ConnectOptions, Database};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::schemas::AppState;

/// Runtime settings, layered as defaults < environment.
///
/// Every field can be overridden with a `RECIPEBOOK__` prefixed variable
/// using `__` as the nesting separator, e.g.
/// `RECIPEBOOK__CACHE__TOKEN_TTL_SECS=60`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Maximum number of resolved tokens kept in memory
    pub token_capacity: u64,
    /// How long a resolved token is trusted before it is looked up again
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub request_timeout_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            token_capacity: 10_000,
            token_ttl_secs: 300,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from environment variables, with defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(
                config::Environment::with_prefix("RECIPEBOOK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "Error serializing settings"),
        }
    }
}

/// Build the token cache described by the settings.
pub fn build_token_cache(settings: &Settings) -> Cache<String, crate::auth::AuthenticatedUser> {
    Cache::builder()
        .max_capacity(settings.cache.token_capacity)
        .time_to_live(Duration::from_secs(settings.cache.token_ttl_secs))
        .support_invalidation_closures()
        .build()
}

/// Initialize application state for the given database URL
pub async fn initialize_app_state_with_url(database_url: &str, settings: Settings) -> Result<AppState> {
    info!("Connecting to database: {}", database_url);
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;

    debug!("Loaded settings: {}", settings);
    let token_cache = build_token_cache(&settings);

    Ok(AppState {
        db,
        token_cache,
        settings,
    })
}
