use std::net::SocketAddr;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "BloodLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_RATE_PER_MINUTE: u32 = 10;
pub const DEFAULT_RATE_PER_HOUR: u32 = 100;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "bloodlens_lib=debug,bloodlens=debug,tower_http=info,warn"
    } else {
        "bloodlens_lib=info,bloodlens=info,warn"
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout_secs: u64,
    pub allowed_origin: String,
    pub rate_per_minute: u32,
    pub rate_per_hour: u32,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let gemini_api_key =
            get("GEMINI_API_KEY").ok_or(ConfigError::MissingVar("GEMINI_API_KEY"))?;

        Ok(Self {
            bind_addr: parse_or(&get, "BLOODLENS_BIND_ADDR", DEFAULT_BIND_ADDR)?,
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_timeout_secs: parse_or(&get, "GEMINI_TIMEOUT_SECS", DEFAULT_GEMINI_TIMEOUT_SECS)?,
            allowed_origin: get("BLOODLENS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string()),
            rate_per_minute: parse_or(&get, "BLOODLENS_RATE_PER_MINUTE", DEFAULT_RATE_PER_MINUTE)?,
            rate_per_hour: parse_or(&get, "BLOODLENS_RATE_PER_HOUR", DEFAULT_RATE_PER_HOUR)?,
            max_upload_bytes: parse_or(&get, "BLOODLENS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn parse_or<T, G, D>(get: &G, var: &'static str, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
    D: ToString,
{
    let raw = get(var).unwrap_or_else(|| default.to_string());
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value: raw.clone(),
    })
}
