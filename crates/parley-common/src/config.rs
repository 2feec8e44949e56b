//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call parley_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let cfg = config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 2735)?
        .set_default("hub.enforce_roles", true)?
        .set_default("hub.outbound_queue", 64)?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (PARLEY_SERVER__PORT, PARLEY_HUB__ENFORCE_ROLES, etc.)
        .add_source(
            config::Environment::with_prefix("PARLEY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub hub: HubConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HubConfig {
    /// Enforce owner/non-owner slot uniqueness at subscribe time. With this
    /// off, the first two comers take the room regardless of claimed role.
    pub enforce_roles: bool,
    /// Per-peer outbound queue capacity. A peer that falls this far behind
    /// is treated as dead and disconnected.
    pub outbound_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            enforce_roles: true,
            outbound_queue: 64,
        }
    }
}
