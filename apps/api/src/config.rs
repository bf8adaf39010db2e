use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
/// 00:05:00 every day (sec min hour dom mon dow).
const DEFAULT_SUMMARY_CRON: &str = "0 5 0 * * *";
const DEFAULT_SUMMARY_TIMEZONE: &str = "Asia/Seoul";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

/// Application configuration loaded from environment variables.
/// Built once at startup and passed by reference; nothing reads the
/// environment after this.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini: GeminiConfig,
    pub schedule: ScheduleConfig,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub cron: String,
    pub timezone: Tz,
    /// Caller-side bound on a single generation call.
    pub generation_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let timezone_name = optional_env("SUMMARY_TIMEZONE", DEFAULT_SUMMARY_TIMEZONE);
        let timeout_secs = optional_env(
            "GENERATION_TIMEOUT_SECS",
            &DEFAULT_GENERATION_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .context("GENERATION_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gemini: GeminiConfig {
                api_key: require_env("GEMINI_API_KEY")?,
                model: optional_env("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                api_url: optional_env("GEMINI_API_URL", DEFAULT_GEMINI_API_URL),
            },
            schedule: ScheduleConfig {
                cron: optional_env("SUMMARY_CRON", DEFAULT_SUMMARY_CRON),
                timezone: parse_timezone(&timezone_name)?,
                generation_timeout: Duration::from_secs(timeout_secs),
            },
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow!("SUMMARY_TIMEZONE '{name}' is not a valid IANA timezone: {e}"))
}
