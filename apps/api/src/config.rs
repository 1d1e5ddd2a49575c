use std::str::FromStr;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::requests::fetcher::FetchMode;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub port: u16,
    pub rust_log: String,
    /// Rows per page in the request list.
    pub page_size: usize,
    /// Zoom at or above which the map always draws individual markers.
    pub map_min_zoom: f64,
    /// Point count at or below which the map draws markers at any zoom.
    pub map_max_markers: usize,
    /// When false the heat layer is treated as unavailable and the map falls back to markers.
    pub heatmap_enabled: bool,
    pub fetch_mode: FetchMode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            page_size: optional_env("PAGE_SIZE", 10)?,
            map_min_zoom: optional_env("MAP_MIN_ZOOM", 16.0)?,
            map_max_markers: optional_env("MAP_MAX_MARKERS", 100)?,
            heatmap_enabled: optional_env("HEATMAP_ENABLED", true)?,
            fetch_mode: optional_env("FETCH_MODE", FetchMode::ServerSide)?,
        })
    }
}

/// Only what the `import` command needs: loads `.env` and reads `DATABASE_URL`.
pub fn database_url_from_env() -> Result<String> {
    dotenvy::dotenv().ok();
    require_env("DATABASE_URL")
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
