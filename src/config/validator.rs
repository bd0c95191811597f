//! Config validation: fail fast at startup instead of at the first login.

use crate::config::AppConfig;
use crate::error::ConfigError;

/// bcrypt accepts costs in this range.
pub const HASH_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let auth = &config.auth;
    if auth.signing_secret.trim().is_empty() {
        return Err(ConfigError::Missing("SIGNING_SECRET"));
    }
    if auth.soft_refresh <= chrono::Duration::zero() {
        return Err(ConfigError::Invalid {
            key: "TOKEN_SOFT_REFRESH_MINUTES",
            reason: "must be positive".into(),
        });
    }
    if auth.hard_expiry <= auth.soft_refresh {
        return Err(ConfigError::Invalid {
            key: "TOKEN_HARD_EXPIRY_MINUTES",
            reason: "must be longer than the soft refresh window".into(),
        });
    }
    if !HASH_COST_RANGE.contains(&auth.hash_cost) {
        return Err(ConfigError::Invalid {
            key: "HASH_COST",
            reason: format!("must be within {:?}", HASH_COST_RANGE),
        });
    }
    if config.max_connections == 0 {
        return Err(ConfigError::Invalid {
            key: "DATABASE_MAX_CONNECTIONS",
            reason: "must be at least 1".into(),
        });
    }
    Ok(())
}
