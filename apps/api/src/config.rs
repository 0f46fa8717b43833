use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Panics at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Sections longer than this many characters are chunked before rewrite.
    pub section_chunk_limit: usize,
    /// Score cache TTL and size cap.
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// Rescore guardrail: a post-optimization total may regress by up to
    /// `regression_allowance` points if some category improved by at least
    /// `category_gain_offset` points. Product policy, kept tunable.
    pub regression_allowance: u32,
    pub category_gain_offset: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: env_or("PORT", "8080")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            section_chunk_limit: env_or("SECTION_CHUNK_LIMIT", "6000")?,
            cache_ttl_secs: env_or("SCORE_CACHE_TTL_SECS", "900")?,
            cache_capacity: env_or("SCORE_CACHE_CAPACITY", "256")?,
            regression_allowance: env_or("REGRESSION_ALLOWANCE", "5")?,
            category_gain_offset: env_or("CATEGORY_GAIN_OFFSET", "5")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' is not a valid value"))
}
