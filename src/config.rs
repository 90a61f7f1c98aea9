use std::env as std_env;

use config::{Config, Environment, File};
use serde::Deserialize;

/// Application configuration, layered from `config/default.toml` (optional)
/// and `APP__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "defaults::host")]
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "defaults::auto_migrate")]
    pub auto_migrate: bool,
    #[serde(default = "defaults::max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "defaults::min_connections")]
    pub db_min_connections: u32,
}

mod defaults {
    pub fn host() -> String {
        "0.0.0.0".to_string()
    }
    pub fn port() -> u16 {
        8080
    }
    pub fn log_level() -> String {
        "info".to_string()
    }
    pub fn auto_migrate() -> bool {
        true
    }
    pub fn max_connections() -> u32 {
        10
    }
    pub fn min_connections() -> u32 {
        1
    }
}

impl AppConfig {
    /// Minimal constructor used by tests.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: defaults::host(),
            port: defaults::port(),
            log_level: defaults::log_level(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: defaults::max_connections(),
            db_min_connections: defaults::min_connections(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let cfg = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;
    Ok(cfg.try_deserialize()?)
}

/// Initializes the global tracing subscriber. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("maintops_api={},tower_http=info", level);
    let filter_directive = std_env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter_directive));
    if json {
        let _ = registry.with(fmt::layer().json()).try_init();
    } else {
        let _ = registry.with(fmt::layer()).try_init();
    }
}
