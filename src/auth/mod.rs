//! Credentials and tokens: bcrypt password hashing, HS256 tokens with dual
//! expiry, and the permission gate that classifies each request.

pub mod account;
pub mod gate;
pub mod password;
pub mod token;

pub use account::{AccountSource, Accounts, Standing};
pub use gate::{authorize, Decision, Guard, Permission};
pub use token::{Claims, TokenState};

use crate::config::AuthConfig;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Issues and verifies credentials. One instance is built at startup from
/// [`AuthConfig`] and shared behind an `Arc`.
pub struct Auth {
    config: AuthConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Auth {
    pub fn new(config: AuthConfig) -> Self {
        let secret = config.signing_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Auth {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            config,
        }
    }

    pub fn get_secret(&self) -> &str {
        &self.config.signing_secret
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// bcrypt on the blocking pool; awaited to completion.
    pub async fn hash_password(&self, plaintext: &str) -> Result<String, AppError> {
        let plaintext = plaintext.to_string();
        let cost = self.config.hash_cost;
        tokio::task::spawn_blocking(move || password::hash_password(&plaintext, cost))
            .await
            .map_err(|e| AppError::Dependency(format!("hashing task: {}", e)))?
            .map_err(|e| AppError::Dependency(format!("bcrypt: {}", e)))
    }

    /// Never errors: any failure is a non-match.
    pub async fn verify_password(&self, hash: &str, plaintext: &str) -> bool {
        if plaintext.is_empty() {
            return false;
        }
        let hash = hash.to_string();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || password::verify_password(&hash, &plaintext))
            .await
            .unwrap_or(false)
    }

    pub fn get_token(&self, username: &str, user_id: i64, is_admin: bool) -> Result<String, AppError> {
        self.get_token_with_perms(username, user_id, is_admin, &[])
    }

    pub fn get_token_with_perms(
        &self,
        username: &str,
        user_id: i64,
        is_admin: bool,
        perms: &[Permission],
    ) -> Result<String, AppError> {
        self.issue_at(username, user_id, is_admin, perms, Utc::now())
    }

    /// Replace a stale token. The new claims come from the account's current
    /// standing, not from `stale`: a deleted account is unauthenticated and a
    /// banned one is refused.
    pub async fn reissue(
        &self,
        accounts: &dyn AccountSource,
        stale: &Claims,
        now: DateTime<Utc>,
    ) -> Result<(Claims, String), AppError> {
        let user_id = stale.user_id()?;
        let standing = accounts
            .standing(user_id)
            .await?
            .ok_or(AppError::Unauthenticated("account no longer exists"))?;
        if standing.banned {
            tracing::warn!(user_id, "refresh refused: banned");
            return Err(AppError::Forbidden("account is banned"));
        }
        let claims = self.claims_at(&standing.username, user_id, standing.is_admin, &standing.perms, now);
        let token = self.sign(&claims)?;
        Ok((claims, token))
    }

    pub(crate) fn issue_at(
        &self,
        username: &str,
        user_id: i64,
        is_admin: bool,
        perms: &[Permission],
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        self.sign(&self.claims_at(username, user_id, is_admin, perms, now))
    }

    fn claims_at(&self, username: &str, user_id: i64, is_admin: bool, perms: &[Permission], now: DateTime<Utc>) -> Claims {
        Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            is_admin,
            perms: perms.to_vec(),
            iat: now.timestamp(),
            exp: (now + self.config.hard_expiry).timestamp(),
            use_exp: (now + self.config.soft_refresh).timestamp(),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Dependency(format!("token signing: {}", e)))
    }

    /// Verifies signature and hard expiry; malformed tokens are rejected.
    pub fn decode(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}
