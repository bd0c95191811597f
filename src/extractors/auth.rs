//! Bearer-token middleware and the guard extractors built on [`authorize`].
//!
//! `auth_layer` decodes `Authorization: Bearer <token>` once per request and
//! leaves the claims in the request extensions. The extractors then apply the
//! route's guard. When a guard sees a stale token it mints a replacement from
//! the account's current standing, and `auth_layer` copies it into the
//! `x-refresh-token` response header.

use crate::auth::{authorize, Accounts, Auth, Claims, Guard, Permission};
use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// Response header carrying a replacement token.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Claims decoded by [`auth_layer`]. `None` when the header is absent or invalid.
#[derive(Clone, Debug, Default)]
pub struct DecodedClaims(pub Option<Claims>);

/// Where a guard leaves a refreshed token for [`auth_layer`] to publish.
#[derive(Clone, Debug, Default)]
pub struct RefreshSlot(Arc<Mutex<Option<String>>>);

impl RefreshSlot {
    fn set(&self, token: String) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(token);
        }
    }

    fn take(&self) -> Option<String> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn auth_layer(State(auth): State<Arc<Auth>>, mut req: Request, next: Next) -> Response {
    let claims = bearer_token(req.headers()).and_then(|token| match auth.decode(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring invalid bearer token");
            None
        }
    });
    let slot = RefreshSlot::default();
    req.extensions_mut().insert(DecodedClaims(claims));
    req.extensions_mut().insert(slot.clone());

    let mut res = next.run(req).await;
    if let Some(token) = slot.take() {
        match HeaderValue::from_str(&token) {
            Ok(v) => {
                res.headers_mut().insert(REFRESH_TOKEN_HEADER, v);
            }
            Err(e) => tracing::warn!(error = %e, "refreshed token is not a valid header value"),
        }
    }
    res
}

/// Identity is settled first, so a missing or expired token is a 401 whatever
/// the route requires. A stale token is replaced from the account's current
/// standing before the route's guard runs against the replacement claims.
async fn run_guard<S>(parts: &Parts, state: &S, guard: Guard, required: &[Permission]) -> Result<Option<Claims>, AppError>
where
    Arc<Auth>: FromRef<S>,
    Accounts: FromRef<S>,
{
    let claims = parts
        .extensions
        .get::<DecodedClaims>()
        .and_then(|c| c.0.clone());
    let now = Utc::now();
    let identity = authorize(claims, Guard::User, &[], now)?;
    let mut claims = identity.claims;
    if identity.refresh {
        if let Some(stale) = claims.take() {
            let auth = Arc::<Auth>::from_ref(state);
            let accounts = Accounts::from_ref(state);
            let (fresh, token) = auth.reissue(accounts.as_ref(), &stale, now).await?;
            if let Some(slot) = parts.extensions.get::<RefreshSlot>() {
                slot.set(token);
            }
            tracing::debug!(user = %fresh.sub, "issued refreshed token");
            claims = Some(fresh);
        }
    }
    Ok(authorize(claims, guard, required, now)?.claims)
}

/// Permissions a guarded route requires; the caller needs at least one of them.
pub trait PermissionSet: Send + Sync + 'static {
    const REQUIRED: &'static [Permission];
}

/// No specific permission required.
pub struct AnyPermission;
impl PermissionSet for AnyPermission {
    const REQUIRED: &'static [Permission] = &[];
}

pub struct NeedsSubmit;
impl PermissionSet for NeedsSubmit {
    const REQUIRED: &'static [Permission] = &[Permission::CanSubmit];
}

pub struct NeedsReview;
impl PermissionSet for NeedsReview {
    const REQUIRED: &'static [Permission] = &[Permission::CanReview];
}

pub struct NeedsReport;
impl PermissionSet for NeedsReport {
    const REQUIRED: &'static [Permission] = &[Permission::CanReport];
}

pub struct NeedsMessage;
impl PermissionSet for NeedsMessage {
    const REQUIRED: &'static [Permission] = &[Permission::CanMessage];
}

/// Unauthenticated-allowed routes: claims when a valid token was sent.
#[derive(Clone, Debug)]
pub struct OptionalUser(pub Option<Claims>);

impl OptionalUser {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().map(|c| c.is_admin).unwrap_or(false)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<DecodedClaims>()
            .and_then(|c| c.0.clone());
        Ok(OptionalUser(claims))
    }
}

/// Authenticated user holding at least one of `R::REQUIRED` (if any).
pub struct RequireUser<R = AnyPermission> {
    pub claims: Claims,
    _required: PhantomData<fn() -> R>,
}

#[async_trait]
impl<S, R> FromRequestParts<S> for RequireUser<R>
where
    S: Send + Sync,
    Arc<Auth>: FromRef<S>,
    Accounts: FromRef<S>,
    R: PermissionSet,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = run_guard(parts, state, Guard::User, R::REQUIRED)
            .await?
            .ok_or(AppError::Unauthenticated("authentication required"))?;
        Ok(RequireUser {
            claims,
            _required: PhantomData,
        })
    }
}

/// Authenticated admin; `isAdmin` is checked before `R::REQUIRED`.
pub struct RequireAdmin<R = AnyPermission> {
    pub claims: Claims,
    _required: PhantomData<fn() -> R>,
}

#[async_trait]
impl<S, R> FromRequestParts<S> for RequireAdmin<R>
where
    S: Send + Sync,
    Arc<Auth>: FromRef<S>,
    Accounts: FromRef<S>,
    R: PermissionSet,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = run_guard(parts, state, Guard::Admin, R::REQUIRED)
            .await?
            .ok_or(AppError::Unauthenticated("authentication required"))?;
        Ok(RequireAdmin {
            claims,
            _required: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::account::testing::{active, StaticAccounts};
    use crate::config::AuthConfig;
    use axum::{body::Body, http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    static ADMIN_HITS: AtomicUsize = AtomicUsize::new(0);

    async fn open(user: OptionalUser) -> String {
        user.0.map(|c| c.username).unwrap_or_else(|| "anonymous".into())
    }

    async fn whoami(user: RequireUser) -> String {
        user.claims.username
    }

    async fn report(user: RequireUser<NeedsReport>) -> String {
        user.claims.username
    }

    async fn admin(user: RequireAdmin) -> String {
        ADMIN_HITS.fetch_add(1, Ordering::SeqCst);
        user.claims.username
    }

    fn auth() -> Arc<Auth> {
        let mut config = AuthConfig::with_secret("gate-secret");
        config.hash_cost = 4;
        Arc::new(Auth::new(config))
    }

    #[derive(Clone)]
    struct GateState {
        auth: Arc<Auth>,
        accounts: Accounts,
    }

    impl FromRef<GateState> for Arc<Auth> {
        fn from_ref(state: &GateState) -> Self {
            state.auth.clone()
        }
    }

    impl FromRef<GateState> for Accounts {
        fn from_ref(state: &GateState) -> Self {
            state.accounts.clone()
        }
    }

    fn app(auth: Arc<Auth>) -> Router {
        let accounts = StaticAccounts::default()
            .with(42, active("alice", false, &[]))
            .with(1, active("root", true, &[]));
        app_with(auth, accounts)
    }

    fn app_with(auth: Arc<Auth>, accounts: StaticAccounts) -> Router {
        let state = GateState {
            auth: auth.clone(),
            accounts: accounts.into_accounts(),
        };
        Router::new()
            .route("/open", get(open))
            .route("/me", get(whoami))
            .route("/report", get(report))
            .route("/admin", get(admin))
            .layer(from_fn_with_state(auth, auth_layer))
            .with_state(state)
    }

    fn stale_token(auth: &Auth, username: &str, user_id: i64, is_admin: bool) -> String {
        auth.issue_at(username, user_id, is_admin, &[], Utc::now() - Duration::minutes(20))
            .unwrap()
    }

    fn refreshed_claims(auth: &Auth, res: &Response) -> Option<Claims> {
        let token = res.headers().get(REFRESH_TOKEN_HEADER)?.to_str().ok()?;
        auth.decode(token).ok()
    }

    async fn call(app: Router, uri: &str, token: Option<&str>) -> Response {
        let mut req = axum::http::Request::builder().uri(uri);
        if let Some(t) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", t));
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn body_text(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_open_route_allows_anonymous_and_bad_tokens() {
        let auth = auth();
        let res = call(app(auth.clone()), "/open", None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "anonymous");

        let res = call(app(auth.clone()), "/open", Some("garbage")).await;
        assert_eq!(body_text(res).await, "anonymous");

        let token = auth.get_token("alice", 42, false).unwrap();
        let res = call(app(auth), "/open", Some(&token)).await;
        assert_eq!(body_text(res).await, "alice");
    }

    #[tokio::test]
    async fn test_user_route() {
        let auth = auth();
        assert_eq!(call(app(auth.clone()), "/me", None).await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            call(app(auth.clone()), "/me", Some("not.a.token")).await.status(),
            StatusCode::UNAUTHORIZED
        );
        let token = auth.get_token("alice", 42, false).unwrap();
        let res = call(app(auth), "/me", Some(&token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(REFRESH_TOKEN_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_user_route_with_permissions() {
        let auth = auth();
        let plain = auth.get_token("alice", 42, false).unwrap();
        assert_eq!(call(app(auth.clone()), "/report", Some(&plain)).await.status(), StatusCode::FORBIDDEN);
        let reporter = auth
            .get_token_with_perms("alice", 42, false, &[Permission::CanReport])
            .unwrap();
        assert_eq!(call(app(auth), "/report", Some(&reporter)).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_route_ordering() {
        let auth = auth();
        let before = ADMIN_HITS.load(Ordering::SeqCst);
        assert_eq!(call(app(auth.clone()), "/admin", None).await.status(), StatusCode::UNAUTHORIZED);
        let user = auth.get_token("alice", 42, false).unwrap();
        assert_eq!(call(app(auth.clone()), "/admin", Some(&user)).await.status(), StatusCode::FORBIDDEN);
        assert_eq!(ADMIN_HITS.load(Ordering::SeqCst), before);

        let admin = auth.get_token("root", 1, true).unwrap();
        assert_eq!(call(app(auth), "/admin", Some(&admin)).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stale_token_gets_refreshed_header() {
        let auth = auth();
        let stale = auth
            .issue_at("alice", 42, false, &[], Utc::now() - Duration::minutes(20))
            .unwrap();
        let res = call(app(auth.clone()), "/me", Some(&stale)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let refreshed = res
            .headers()
            .get(REFRESH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap();
        assert_eq!(body_text(res).await, "alice");
        let claims = auth.decode(&refreshed).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.use_exp > Utc::now().timestamp());
    }

    #[tokio::test]
    async fn test_open_route_does_not_refresh() {
        let auth = auth();
        let stale = auth
            .issue_at("alice", 42, false, &[], Utc::now() - Duration::minutes(20))
            .unwrap();
        let res = call(app(auth), "/open", Some(&stale)).await;
        assert!(res.headers().get(REFRESH_TOKEN_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_stale_refresh_drops_revoked_admin() {
        let auth = auth();
        let accounts = StaticAccounts::default().with(1, active("root", false, &[]));
        let stale = stale_token(&auth, "root", 1, true);
        let res = call(app_with(auth.clone(), accounts), "/admin", Some(&stale)).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let replacement = refreshed_claims(&auth, &res).unwrap();
        assert!(!replacement.is_admin);
    }

    #[tokio::test]
    async fn test_stale_refresh_picks_up_new_permissions() {
        let auth = auth();
        let accounts = StaticAccounts::default().with(42, active("alice", false, &[Permission::CanReport]));
        let stale = stale_token(&auth, "alice", 42, false);
        let res = call(app_with(auth.clone(), accounts), "/report", Some(&stale)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let replacement = refreshed_claims(&auth, &res).unwrap();
        assert_eq!(replacement.perms, vec![Permission::CanReport]);
    }

    #[tokio::test]
    async fn test_stale_token_of_banned_account_is_refused() {
        let auth = auth();
        let mut banned = active("alice", false, &[]);
        banned.banned = true;
        let accounts = StaticAccounts::default().with(42, banned);
        let stale = stale_token(&auth, "alice", 42, false);
        let res = call(app_with(auth.clone(), accounts), "/me", Some(&stale)).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(res.headers().get(REFRESH_TOKEN_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_stale_token_of_deleted_account_is_unauthenticated() {
        let auth = auth();
        let stale = stale_token(&auth, "ghost", 99, false);
        let res = call(app(auth), "/me", Some(&stale)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_fresh_token_skips_account_lookup() {
        let auth = auth();
        let token = auth.get_token("alice", 42, false).unwrap();
        let res = call(app_with(auth, StaticAccounts::default()), "/me", Some(&token)).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
