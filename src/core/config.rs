//! Environment-based bot configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{Context, Result};

/// Runtime configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token (required)
    pub discord_token: String,
    /// Path to the SQLite database file
    pub database_path: String,
    /// Default log filter passed to env_logger
    pub log_level: String,
    /// Optional guild id for instant guild-scoped command registration
    /// (development mode). When unset, commands are registered globally.
    pub discord_guild_id: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `DISCORD_TOKEN` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .context("DISCORD_TOKEN environment variable is required")?;

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "chime.db".to_string());

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let discord_guild_id = std::env::var("DISCORD_GUILD_ID").ok().filter(|v| !v.is_empty());

        Ok(Config {
            discord_token,
            database_path,
            log_level,
            discord_guild_id,
        })
    }
}
