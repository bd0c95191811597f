//! Public profiles and profile edits.

use crate::error::AppError;
use crate::extractors::RequireUser;
use crate::response::success_one_ok;
use crate::service::users::{self, UserPatch};
use crate::service::{parse_id, RequestValidator, EMAIL, LONG_TEXT};
use crate::state::AppState;
use crate::store::Connection;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub bio: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
    pub banned: Option<bool>,
    pub can_submit: Option<bool>,
    pub can_review: Option<bool>,
    pub can_report: Option<bool>,
    pub can_message: Option<bool>,
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let mut conn = Connection::acquire(&state.pool).await?;
    let user = users::get_user(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    Ok(success_one_ok(user))
}

/// Users edit their own profile; admins edit anyone's and may also moderate.
pub async fn update_user(
    State(state): State<AppState>,
    caller: RequireUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let is_admin = caller.claims.is_admin;
    if caller.claims.user_id()? != id && !is_admin {
        return Err(AppError::Forbidden("cannot edit another user's profile"));
    }
    RequestValidator::check("email", body.email.as_deref(), &EMAIL)?;
    RequestValidator::check("bio", body.bio.as_deref(), &LONG_TEXT)?;
    let password_hash = match body.password.as_deref() {
        Some(pw) => {
            RequestValidator::check_password("password", pw)?;
            Some(state.auth.hash_password(pw).await?)
        }
        None => None,
    };

    let patch = UserPatch {
        email: body.email,
        bio: body.bio,
        password_hash,
        is_admin: body.is_admin,
        banned: body.banned,
        can_submit: body.can_submit,
        can_review: body.can_review,
        can_report: body.can_report,
        can_message: body.can_message,
    };
    let mut conn = Connection::acquire(&state.pool).await?;
    if users::update_user(&mut conn, id, &patch, is_admin).await? {
        tracing::info!(user_id = id, by = %caller.claims.sub, "profile updated");
    }
    let user = users::get_user(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    conn.close();
    Ok(success_one_ok(user))
}
