// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the profile/friend REST API
    pub api_base_url: String,
    /// Base URL of the OTP identity provider (e.g. `https://x.supabase.co/auth/v1`)
    pub auth_url: String,
    /// Public API key sent to the identity provider
    pub auth_api_key: String,
    /// redb database holding persisted client state
    pub state_path: PathBuf,
    /// Per-request timeout for backend calls
    pub http_timeout: Duration,
    /// Retries for idempotent requests after the first attempt
    pub http_max_retries: u32,
    /// Optional JSON export of the device address book
    pub contacts_file: Option<PathBuf>,
    /// Messaging token handed over by the platform push service, if any
    pub push_token: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            auth_url: "http://localhost:9999/auth/v1".to_string(),
            auth_api_key: "test_api_key".to_string(),
            state_path: PathBuf::from("real-friends-state.redb"),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            http_max_retries: DEFAULT_HTTP_MAX_RETRIES,
            contacts_file: None,
            push_token: None,
        }
    }
}

const DEFAULT_API_BASE_URL: &str = "https://ios-starter-api-production.up.railway.app";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_HTTP_MAX_RETRIES: u32 = 2;

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let http_timeout_secs = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("HTTP_TIMEOUT_SECS", v))?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let http_max_retries = match env::var("HTTP_MAX_RETRIES") {
            Ok(v) => v
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::Invalid("HTTP_MAX_RETRIES", v))?,
            Err(_) => DEFAULT_HTTP_MAX_RETRIES,
        };

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            auth_url: env::var("AUTH_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("AUTH_URL"))?,
            auth_api_key: env::var("AUTH_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("AUTH_API_KEY"))?,
            state_path: env::var("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("real-friends-state.redb")),
            http_timeout: Duration::from_secs(http_timeout_secs),
            http_max_retries,
            contacts_file: env::var("CONTACTS_FILE").ok().map(PathBuf::from),
            push_token: env::var("PUSH_TOKEN").ok().filter(|t| !t.trim().is_empty()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
