use anyhow::{Context, Result};

use crate::llm_client::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES};

/// Engine configuration loaded from environment variables.
///
/// A missing `ANTHROPIC_API_KEY` is fatal at construction time unless
/// `OFFLINE_MODE` is set — offline runs never touch the network.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: Option<String>,
    pub offline: bool,
    pub llm_max_retries: u32,
    pub llm_base_delay_ms: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let offline = std::env::var("OFFLINE_MODE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let anthropic_api_key = if offline {
            std::env::var("ANTHROPIC_API_KEY").ok()
        } else {
            Some(require_env("ANTHROPIC_API_KEY")?)
        };

        Ok(Config {
            anthropic_api_key,
            offline,
            llm_max_retries: std::env::var("LLM_MAX_RETRIES")
                .unwrap_or_else(|_| DEFAULT_MAX_RETRIES.to_string())
                .parse::<u32>()
                .context("LLM_MAX_RETRIES must be a non-negative integer")?,
            llm_base_delay_ms: std::env::var("LLM_BASE_DELAY_MS")
                .unwrap_or_else(|_| DEFAULT_BASE_DELAY_MS.to_string())
                .parse::<u64>()
                .context("LLM_BASE_DELAY_MS must be a number of milliseconds")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
