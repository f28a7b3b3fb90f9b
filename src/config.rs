//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the platform REST API (e.g. `https://api.example.com`)
    pub api_base_url: String,
    /// Refresh this long before the access token expires
    pub refresh_buffer: Duration,
    /// Timeout for auth API requests
    pub http_timeout: Duration,
    /// Where the session credentials are persisted
    pub session_file: PathBuf,
    /// Sign-in entry point users are sent to when the session ends
    pub login_url: String,

    // --- Optional credentials for unattended login ---
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            refresh_buffer: Duration::from_secs(300),
            http_timeout: Duration::from_secs(10),
            session_file: PathBuf::from("session.json"),
            login_url: "/login".to_string(),
            username: None,
            password: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("API_BASE_URL"))?,
            refresh_buffer: Duration::from_secs(parse_secs("REFRESH_BUFFER_SECS", 300)?),
            http_timeout: Duration::from_secs(parse_secs("HTTP_TIMEOUT_SECS", 10)?),
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("session.json")),
            login_url: env::var("LOGIN_URL").unwrap_or_else(|_| "/login".to_string()),
            username: env::var("SESSION_USERNAME").ok(),
            password: env::var("SESSION_PASSWORD").ok(),
        })
    }

    /// Username and password, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }
}

fn parse_secs(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, value)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
