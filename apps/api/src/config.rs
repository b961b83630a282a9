use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::models::profile::{BaseProfile, PreferenceProfile};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    /// Absent disables the discovery trigger.
    pub serpapi_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub preferences_path: PathBuf,
    pub base_profile_path: PathBuf,
    pub max_concurrent_generations: usize,
    pub generation_timeout_secs: u64,
    pub search_results_per_query: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            serpapi_api_key: optional_env("SERPAPI_API_KEY"),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            preferences_path: optional_env("PREFERENCES_PATH")
                .unwrap_or_else(|| "data/preferences.json".to_string())
                .into(),
            base_profile_path: optional_env("BASE_PROFILE_PATH")
                .unwrap_or_else(|| "data/base_profile.json".to_string())
                .into(),
            max_concurrent_generations: parse_env("MAX_CONCURRENT_GENERATIONS", 5)?,
            generation_timeout_secs: parse_env("GENERATION_TIMEOUT_SECS", 90)?,
            search_results_per_query: parse_env("SEARCH_RESULTS_PER_QUERY", 10)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_preferences(path: &Path) -> Result<PreferenceProfile> {
    let profile: PreferenceProfile = load_json(path)?;
    profile
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid preference profile {}: {e}", path.display()))?;
    Ok(profile)
}

pub fn load_base_profile(path: &Path) -> Result<BaseProfile> {
    let profile: BaseProfile = load_json(path)?;
    profile
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid base profile {}: {e}", path.display()))?;
    Ok(profile)
}
