use std::{fmt::Display, str::FromStr};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub session_secure: bool,
    pub session_inactivity_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://studybud.db".to_owned(),
            database_max_connections: 16,
            bind_addr: "0.0.0.0:8080".to_owned(),
            session_secure: false,
            session_inactivity_minutes: 120,
        }
    }
}

impl Config {
    /// Reads the environment, after loading `.env` if there is one.
    pub fn load() -> anyhow::Result<Self> {
        if dotenv::dotenv().is_err() {
            info!("no .env file, using the process environment");
        }

        let defaults = Self::default();
        Ok(Self {
            database_url: try_load("DATABASE_URL", defaults.database_url)?,
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
            bind_addr: try_load("BIND_ADDR", defaults.bind_addr)?,
            session_secure: try_load("SESSION_SECURE", defaults.session_secure)?,
            session_inactivity_minutes: try_load("SESSION_INACTIVITY_MINUTES", defaults.session_inactivity_minutes)?,
        })
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(value) = dotenv::var(key) else {
        info!("{key} not set, using default: {default}");
        return Ok(default);
    };

    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("environment misconfigured: {key}={value}: {e}")
    })
}
