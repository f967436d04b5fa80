use std::env;
use std::time::Duration;

use scopewise_core::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub remote_url: String,
    pub remote_token: Option<String>,
    pub http_timeout: Duration,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub session_id: String,
    pub database_url: Option<String>,
    pub fail_open_while_loading: bool,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        let remote_url = required_env("SCOPEWISE_REMOTE_URL")?
            .trim_end_matches('/')
            .to_owned();
        let http_timeout_ms = parse_env_u64("SCOPEWISE_HTTP_TIMEOUT_MS", 15_000)?;
        if http_timeout_ms == 0 {
            return Err(AppError::InvalidInput(
                "SCOPEWISE_HTTP_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            remote_url,
            remote_token: optional_env("SCOPEWISE_REMOTE_TOKEN"),
            http_timeout: Duration::from_millis(http_timeout_ms),
            redis_url: optional_env("REDIS_URL"),
            redis_key_prefix: optional_env("SCOPEWISE_REDIS_KEY_PREFIX")
                .unwrap_or_else(|| "scopewise".to_owned()),
            session_id: optional_env("SCOPEWISE_SESSION_ID").unwrap_or_else(|| "cli".to_owned()),
            database_url: optional_env("DATABASE_URL"),
            fail_open_while_loading: parse_env_bool(
                "SCOPEWISE_PERMISSIONS_FAIL_OPEN_WHILE_LOADING",
                true,
            )?,
        })
    }
}

fn required_env(name: &str) -> AppResult<String> {
    optional_env(name).ok_or_else(|| AppError::InvalidInput(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::InvalidInput(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => parse_bool(value.as_str()).ok_or_else(|| {
            AppError::InvalidInput(format!("invalid {name} value '{value}': expected a boolean"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
