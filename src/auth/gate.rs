//! Route-level permission decisions. Pure: decoded claims, the route's guard and
//! required permissions, and the current time go in; a decision comes out.

use crate::auth::token::{Claims, TokenState};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capabilities a user can hold independently of being an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    CanSubmit,
    CanReview,
    CanReport,
    CanMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// No check; claims, if any, are passed through.
    Anonymous,
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub claims: Option<Claims>,
    /// Token is past its soft refresh instant; a replacement should be issued.
    pub refresh: bool,
}

/// Authentication (401) is always decided before authorization (403).
pub fn authorize(
    claims: Option<Claims>,
    guard: Guard,
    required: &[Permission],
    now: DateTime<Utc>,
) -> Result<Decision, AppError> {
    if guard == Guard::Anonymous {
        return Ok(Decision {
            claims,
            refresh: false,
        });
    }

    let claims = match claims {
        Some(c) if !c.sub.is_empty() => c,
        _ => return Err(AppError::Unauthenticated("authentication required")),
    };
    let refresh = match claims.state_at(now) {
        TokenState::Expired => return Err(AppError::Unauthenticated("token expired")),
        TokenState::Stale => true,
        TokenState::Fresh => false,
    };

    if guard == Guard::Admin && !claims.is_admin {
        return Err(AppError::Forbidden("admin only"));
    }
    if !required.is_empty() && !required.iter().any(|p| claims.has_permission(*p)) {
        return Err(AppError::Forbidden("missing permission"));
    }

    Ok(Decision {
        claims: Some(claims),
        refresh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(is_admin: bool, perms: &[Permission], issued: DateTime<Utc>) -> Claims {
        Claims {
            sub: "42".into(),
            username: "alice".into(),
            is_admin,
            perms: perms.to_vec(),
            iat: issued.timestamp(),
            exp: (issued + Duration::days(7)).timestamp(),
            use_exp: (issued + Duration::minutes(15)).timestamp(),
        }
    }

    fn status(r: Result<Decision, AppError>) -> u16 {
        match r {
            Ok(_) => 200,
            Err(e) => e.status().as_u16(),
        }
    }

    #[test]
    fn test_anonymous_passes_everything_through() {
        let now = Utc::now();
        let d = authorize(None, Guard::Anonymous, &[], now).unwrap();
        assert_eq!(d.claims, None);
        let c = claims(false, &[], now - Duration::days(30));
        let d = authorize(Some(c.clone()), Guard::Anonymous, &[Permission::CanReport], now).unwrap();
        assert_eq!(d.claims, Some(c));
        assert!(!d.refresh);
    }

    #[test]
    fn test_user_requires_subject() {
        let now = Utc::now();
        assert_eq!(status(authorize(None, Guard::User, &[], now)), 401);
        let mut c = claims(false, &[], now);
        c.sub.clear();
        assert_eq!(status(authorize(Some(c), Guard::User, &[], now)), 401);
    }

    #[test]
    fn test_user_expired_is_unauthenticated() {
        let now = Utc::now();
        let c = claims(true, &[], now - Duration::days(8));
        assert_eq!(status(authorize(Some(c), Guard::Admin, &[], now)), 401);
    }

    #[test]
    fn test_stale_token_requests_refresh() {
        let now = Utc::now();
        let fresh = authorize(Some(claims(false, &[], now)), Guard::User, &[], now).unwrap();
        assert!(!fresh.refresh);
        let stale = authorize(
            Some(claims(false, &[], now - Duration::minutes(30))),
            Guard::User,
            &[],
            now,
        )
        .unwrap();
        assert!(stale.refresh);
    }

    #[test]
    fn test_user_permission_intersection() {
        let now = Utc::now();
        let c = claims(false, &[Permission::CanReview], now);
        assert_eq!(
            status(authorize(Some(c.clone()), Guard::User, &[Permission::CanReport], now)),
            403
        );
        assert_eq!(
            status(authorize(
                Some(c),
                Guard::User,
                &[Permission::CanReport, Permission::CanReview],
                now
            )),
            200
        );
    }

    #[test]
    fn test_admin_guard_ordering() {
        let now = Utc::now();
        assert_eq!(status(authorize(None, Guard::Admin, &[], now)), 401);
        let user = claims(false, &[Permission::CanReport], now);
        assert_eq!(status(authorize(Some(user), Guard::Admin, &[Permission::CanReport], now)), 403);
        let admin = claims(true, &[], now);
        assert_eq!(status(authorize(Some(admin.clone()), Guard::Admin, &[], now)), 200);
        assert_eq!(
            status(authorize(Some(admin), Guard::Admin, &[Permission::CanReport], now)),
            403
        );
    }
}
