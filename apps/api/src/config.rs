use anyhow::{Context, Result};
use chrono::Duration;

use crate::notifications::composer::{
    NotificationConfig, DEFAULT_APPLICANT_WINDOW_HOURS, DEFAULT_NOTIFICATION_CAP,
    DEFAULT_RECRUITER_WINDOW_HOURS,
};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres backs the job store when set; otherwise postings live in memory.
    pub database_url: Option<String>,
    /// Alerts go to Redis pub/sub when set, to the log otherwise.
    pub redis_url: Option<String>,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base for public object URLs. Defaults to `s3_endpoint`.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub notifications: NotificationConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_endpoint = require_env("S3_ENDPOINT")?;
        Ok(Config {
            database_url: non_empty_env("DATABASE_URL"),
            redis_url: non_empty_env("REDIS_URL"),
            s3_bucket: require_env("S3_BUCKET")?,
            s3_public_url: std::env::var("S3_PUBLIC_URL").unwrap_or_else(|_| s3_endpoint.clone()),
            s3_endpoint,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            notifications: NotificationConfig {
                applicant_window: Duration::hours(optional_env(
                    "APPLICANT_ACTIVITY_WINDOW_HOURS",
                    DEFAULT_APPLICANT_WINDOW_HOURS,
                )?),
                recruiter_window: Duration::hours(optional_env(
                    "RECRUITER_ACTIVITY_WINDOW_HOURS",
                    DEFAULT_RECRUITER_WINDOW_HOURS,
                )?),
                cap: optional_env("NOTIFICATION_CAP", DEFAULT_NOTIFICATION_CAP)?,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}
