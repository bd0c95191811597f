//! Inbox, sending, and read receipts.

use crate::error::AppError;
use crate::extractors::{NeedsMessage, RequireUser};
use crate::response::{success_many, success_one};
use crate::service::messages::{self, MessageFilter, NewMessage};
use crate::service::{parse_id, users, FieldRule, RequestValidator, LONG_TEXT, SHORT_TEXT};
use crate::state::AppState;
use crate::store::Connection;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

const MESSAGE_BODY: FieldRule = FieldRule {
    required: true,
    ..LONG_TEXT
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub user_to_id: i64,
    pub subject: Option<String>,
    pub body: String,
}

pub async fn inbox(
    State(state): State<AppState>,
    caller: RequireUser,
    Query(q): Query<InboxQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = MessageFilter {
        user_to_id: Some(caller.claims.user_id()?),
        unread_only: q.unread_only,
        ..Default::default()
    };
    let mut conn = Connection::acquire(&state.pool).await?;
    let rows = messages::get_messages(&mut conn, &filter).await?;
    Ok(success_many(rows))
}

pub async fn send_message(
    State(state): State<AppState>,
    caller: RequireUser<NeedsMessage>,
    Json(body): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    RequestValidator::check("subject", body.subject.as_deref(), &SHORT_TEXT)?;
    RequestValidator::check("body", Some(body.body.as_str()), &MESSAGE_BODY)?;
    if body.user_to_id <= 0 {
        return Err(AppError::BadRequest("invalid recipient".into()));
    }

    let mut conn = Connection::acquire(&state.pool).await?;
    if users::get_user(&mut conn, body.user_to_id).await?.is_none() {
        return Err(AppError::NotFound(format!("user {}", body.user_to_id)));
    }
    let id = messages::add_message(
        &mut conn,
        &NewMessage {
            user_from_id: caller.claims.user_id()?,
            user_to_id: body.user_to_id,
            subject: body.subject,
            body: body.body,
        },
    )
    .await?;
    conn.close();
    Ok(success_one(serde_json::json!({ "id": id })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    caller: RequireUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let mut conn = Connection::acquire(&state.pool).await?;
    if !messages::mark_read(&mut conn, id, caller.claims.user_id()?).await? {
        return Err(AppError::NotFound(format!("message {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
