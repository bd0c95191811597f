//! Load settings from the environment (after `.env`), or from any key lookup in tests.

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use chrono::Duration;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "mysql://localhost/delicious_fruit";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEV_SIGNING_SECRET: &str = "delicious-fruit-development-secret";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let signing_secret = match lookup("SIGNING_SECRET").filter(|s| !s.is_empty()) {
            Some(s) => s,
            None if production => return Err(ConfigError::Missing("SIGNING_SECRET")),
            None => {
                tracing::warn!("SIGNING_SECRET not set; using the development secret");
                DEV_SIGNING_SECRET.to_string()
            }
        };

        let auth = AuthConfig {
            signing_secret,
            hard_expiry: Duration::minutes(parse_or(
                &lookup,
                "TOKEN_HARD_EXPIRY_MINUTES",
                DEFAULT_HARD_EXPIRY_MINUTES,
            )?),
            soft_refresh: Duration::minutes(parse_or(
                &lookup,
                "TOKEN_SOFT_REFRESH_MINUTES",
                DEFAULT_SOFT_REFRESH_MINUTES,
            )?),
            hash_cost: parse_or(&lookup, "HASH_COST", DEFAULT_HASH_COST)?,
        };

        let config = AppConfig {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            production,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", 1024 * 1024)?,
            auth,
        };
        validate(&config)?;
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
