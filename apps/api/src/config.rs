use std::path::PathBuf;

use anyhow::{Context, Result};

/// Immutable per-process configuration loaded from environment variables.
/// Everything the admin can change at runtime lives in `settings` instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory holding the item snapshot, settings document, and fetch
    /// stamp.
    pub data_dir: PathBuf,
    /// Seed token for the source API; a token saved through the settings API
    /// takes precedence.
    pub github_token: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            ),
            github_token: std::env::var("GITHUB_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
