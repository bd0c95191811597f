//! Registration, login and explicit token refresh.

use crate::error::AppError;
use crate::extractors::RequireUser;
use crate::response::{success_one, success_one_ok};
use crate::service::users::{self, NewUser, User};
use crate::service::{RequestValidator, EMAIL, USERNAME};
use crate::state::AppState;
use crate::store::Connection;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
pub struct TokenBody {
    pub token: String,
    pub user: User,
}

const BAD_LOGIN: &str = "invalid username or password";

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = body.username.trim();
    RequestValidator::check("username", Some(username), &USERNAME)?;
    RequestValidator::check_password("password", &body.password)?;
    RequestValidator::check("email", body.email.as_deref(), &EMAIL)?;

    let mut conn = Connection::acquire(&state.pool).await?;
    if users::name_taken(&mut conn, username).await? {
        return Err(AppError::Conflict(format!("username {} is taken", username)));
    }
    let password_hash = state.auth.hash_password(&body.password).await?;
    let id = users::add_user(
        &mut conn,
        &NewUser {
            name: username.to_string(),
            password_hash,
            email: body.email.map(|e| e.trim().to_string()),
        },
    )
    .await?;
    let user = users::get_user(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::Dependency(format!("user {} missing after insert", id)))?;
    conn.close();

    let token = state
        .auth
        .get_token_with_perms(&user.name, user.id, user.is_admin, &user.permissions())?;
    Ok(success_one(TokenBody { token, user }))
}

/// Unknown user and wrong password look the same to the caller.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = Connection::acquire(&state.pool).await?;
    let Some(cred) = users::get_credential(&mut conn, body.username.trim()).await? else {
        tracing::warn!(username = %body.username, "login failed: unknown user");
        return Err(AppError::Unauthenticated(BAD_LOGIN));
    };
    if !state.auth.verify_password(&cred.password_hash, &body.password).await {
        tracing::warn!(user_id = cred.user_id, "login failed: wrong password");
        return Err(AppError::Unauthenticated(BAD_LOGIN));
    }
    let user = users::get_user(&mut conn, cred.user_id)
        .await?
        .ok_or(AppError::Unauthenticated(BAD_LOGIN))?;
    conn.close();

    if user.banned {
        tracing::warn!(user_id = user.id, "login refused: banned");
        return Err(AppError::Forbidden("account is banned"));
    }
    let token = state
        .auth
        .get_token_with_perms(&user.name, user.id, user.is_admin, &user.permissions())?;
    tracing::info!(user_id = user.id, "login");
    Ok(success_one_ok(TokenBody { token, user }))
}

/// Re-reads the account so bans and permission changes take effect.
pub async fn refresh(
    State(state): State<AppState>,
    caller: RequireUser,
) -> Result<impl IntoResponse, AppError> {
    let id = caller.claims.user_id()?;
    let mut conn = Connection::acquire(&state.pool).await?;
    let user = users::get_user(&mut conn, id)
        .await?
        .ok_or(AppError::Unauthenticated("account no longer exists"))?;
    conn.close();

    if user.banned {
        return Err(AppError::Forbidden("account is banned"));
    }
    let token = state
        .auth
        .get_token_with_perms(&user.name, user.id, user.is_admin, &user.permissions())?;
    Ok(success_one_ok(TokenBody { token, user }))
}
