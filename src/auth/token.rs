//! Signed bearer tokens with a hard expiry (`exp`) and a soft refresh instant (`useExp`).

use crate::auth::gate::Permission;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried by every token. Never stored server-side and never mutated;
/// a refresh issues a new token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User id as a string.
    pub sub: String,
    pub username: String,
    pub is_admin: bool,
    #[serde(default)]
    pub perms: Vec<Permission>,
    pub iat: i64,
    /// Hard expiry (unix seconds). Enforced by the verifier.
    pub exp: i64,
    /// Soft refresh instant (unix seconds).
    pub use_exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Fresh,
    /// Past `useExp`, before `exp`: honor it and hand out a replacement.
    Stale,
    Expired,
}

impl Claims {
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        let t = now.timestamp();
        if t >= self.exp {
            TokenState::Expired
        } else if t >= self.use_exp {
            TokenState::Stale
        } else {
            TokenState::Fresh
        }
    }

    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthenticated("invalid token subject"))
    }

    pub fn has_permission(&self, perm: Permission) -> bool {
        self.perms.contains(&perm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(now: DateTime<Utc>) -> Claims {
        Claims {
            sub: "42".into(),
            username: "alice".into(),
            is_admin: false,
            perms: vec![Permission::CanReview],
            iat: now.timestamp(),
            exp: (now + Duration::days(7)).timestamp(),
            use_exp: (now + Duration::minutes(15)).timestamp(),
        }
    }

    #[test]
    fn test_state_transitions() {
        let now = Utc::now();
        let c = claims(now);
        assert_eq!(c.state_at(now), TokenState::Fresh);
        assert_eq!(c.state_at(now + Duration::minutes(16)), TokenState::Stale);
        assert_eq!(c.state_at(now + Duration::days(7)), TokenState::Expired);
    }

    #[test]
    fn test_wire_names() {
        let v = serde_json::to_value(claims(Utc::now())).unwrap();
        assert_eq!(v["sub"], "42");
        assert_eq!(v["isAdmin"], false);
        assert!(v["useExp"].is_i64());
        assert_eq!(v["perms"][0], "CAN_REVIEW");
    }

    #[test]
    fn test_user_id() {
        let mut c = claims(Utc::now());
        assert_eq!(c.user_id().unwrap(), 42);
        c.sub = "alice".into();
        assert!(matches!(c.user_id(), Err(AppError::Unauthenticated(_))));
    }
}
