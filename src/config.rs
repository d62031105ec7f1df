use crate::api::ratelimit::{Credential, MAX_CALLS_PER_KEY_PER_MINUTE};
use crate::error::config::ConfigError;

/// Default per-key call budget per minute when a key is configured without an
/// explicit limit.
pub const DEFAULT_CALLS_PER_KEY_PER_MINUTE: u32 = 20;

/// Process configuration loaded from the environment.
pub struct Config {
    pub database_url: String,
    pub api_base_url: String,
    pub api_keys: Vec<Credential>,
    pub retention_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require_var("DATABASE_URL")?;
        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "https://api.torn.com".to_string());

        let api_keys = parse_api_keys(&require_var("API_KEYS")?)?;
        if api_keys.is_empty() {
            return Err(ConfigError::NoApiKeys);
        }

        let retention_days = match std::env::var("RETENTION_DAYS") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "RETENTION_DAYS".to_string(),
                value,
            })?,
            Err(_) => 30,
        };

        Ok(Self {
            database_url,
            api_base_url,
            api_keys,
            retention_days,
        })
    }
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

/// Parses `API_KEYS`: comma-separated `key` or `key:calls_per_minute` entries.
///
/// Per-key limits are clamped to the global maximum.
fn parse_api_keys(raw: &str) -> Result<Vec<Credential>, ConfigError> {
    let mut credentials = Vec::new();

    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (key, rate_limit) = match entry.split_once(':') {
            Some((key, limit)) => {
                let limit: u32 = limit.parse().map_err(|_| ConfigError::InvalidValue {
                    name: "API_KEYS".to_string(),
                    value: entry.to_string(),
                })?;
                (key, limit.min(MAX_CALLS_PER_KEY_PER_MINUTE))
            }
            None => (entry, DEFAULT_CALLS_PER_KEY_PER_MINUTE),
        };

        credentials.push(Credential {
            key: key.to_string(),
            rate_limit,
        });
    }

    Ok(credentials)
}
