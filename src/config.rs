use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use rand::{distributions::Alphanumeric, Rng};

use crate::constants::{
    DEFAULT_MAX_CONNECTIONS, DEFAULT_MEDIA_ROOT, DEFAULT_PORT, DEFAULT_SESSION_HOURS,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub session_hours: i64,
    pub media_root: PathBuf,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("RECIPE_API_PORT", DEFAULT_PORT)?,
            database_url: var("DATABASE_URL"),
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            jwt_secret: var("JWT_SECRET").unwrap_or_else(|| {
                log::warn!("JWT_SECRET not set, sessions will not survive a restart");
                random_secret()
            }),
            session_hours: try_load("SESSION_HOURS", DEFAULT_SESSION_HOURS)?,
            media_root: var("MEDIA_ROOT")
                .unwrap_or_else(|| DEFAULT_MEDIA_ROOT.to_string())
                .into(),
        })
    }
}

/// Unset and empty variables both count as missing.
fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
