//! Runtime settings for the server and the auth module.

use chrono::Duration;
use std::fmt;

pub const DEFAULT_HARD_EXPIRY_MINUTES: i64 = 7 * 24 * 60;
pub const DEFAULT_SOFT_REFRESH_MINUTES: i64 = 15;
pub const DEFAULT_HASH_COST: u32 = 10;

/// Token signing and password hashing settings. Built once at startup and
/// shared read-only.
#[derive(Clone)]
pub struct AuthConfig {
    pub signing_secret: String,
    /// After this the token is discarded and a full login is required.
    pub hard_expiry: Duration,
    /// After this the token still works but should be replaced.
    pub soft_refresh: Duration,
    pub hash_cost: u32,
}

impl AuthConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        AuthConfig {
            signing_secret: secret.into(),
            hard_expiry: Duration::minutes(DEFAULT_HARD_EXPIRY_MINUTES),
            soft_refresh: Duration::minutes(DEFAULT_SOFT_REFRESH_MINUTES),
            hash_cost: DEFAULT_HASH_COST,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("hard_expiry", &self.hard_expiry)
            .field("soft_refresh", &self.soft_refresh)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// `APP_ENV=production`: the signing secret becomes mandatory.
    pub production: bool,
    pub max_connections: u32,
    pub max_body_bytes: usize,
    pub auth: AuthConfig,
}
