//! Game listing, lookup, submission and moderation.

use crate::error::AppError;
use crate::extractors::{NeedsSubmit, OptionalUser, RequireAdmin, RequireUser};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::games::{self, GameFilter, GameOrder, GamePatch, NewGame};
use crate::service::{parse_id, RequestValidator, GAME_NAME, SHORT_TEXT, URL};
use crate::state::AppState;
use crate::store::Connection;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct GameQuery {
    pub name: Option<String>,
    pub author: Option<String>,
    pub removed: Option<bool>,
    pub order: Option<GameOrder>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub name: String,
    pub url: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub collab: bool,
}

fn check_game_fields(name: Option<&str>, url: Option<&str>, author: Option<&str>) -> Result<(), AppError> {
    RequestValidator::check("url", url, &URL)?;
    RequestValidator::check("author", author, &SHORT_TEXT)?;
    if name.is_some() {
        RequestValidator::check("name", name, &GAME_NAME)?;
    }
    Ok(())
}

pub async fn list_games(
    State(state): State<AppState>,
    user: OptionalUser,
    Query(q): Query<GameQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = GameFilter {
        name: q.name,
        author: q.author,
        removed: q.removed,
        order: q.order.unwrap_or_default(),
        limit: q.limit,
        offset: q.offset,
    };
    let mut conn = Connection::acquire(&state.pool).await?;
    let rows = games::get_games(&mut conn, &filter, user.is_admin()).await?;
    Ok(success_many(rows))
}

pub async fn get_game(
    State(state): State<AppState>,
    user: OptionalUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let mut conn = Connection::acquire(&state.pool).await?;
    let game = games::get_game(&mut conn, id, user.is_admin())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("game {}", id)))?;
    Ok(success_one_ok(game))
}

pub async fn create_game(
    State(state): State<AppState>,
    caller: RequireUser<NeedsSubmit>,
    Json(body): Json<CreateGameRequest>,
) -> Result<impl IntoResponse, AppError> {
    RequestValidator::check("name", Some(body.name.as_str()), &GAME_NAME)?;
    check_game_fields(None, body.url.as_deref(), body.author.as_deref())?;

    let mut conn = Connection::acquire(&state.pool).await?;
    let id = games::add_game(
        &mut conn,
        &NewGame {
            name: body.name.trim().to_string(),
            url: body.url,
            author: body.author,
            collab: body.collab,
            adder_id: caller.claims.user_id()?,
        },
    )
    .await?;
    let game = games::get_game(&mut conn, id, true)
        .await?
        .ok_or_else(|| AppError::Dependency(format!("game {} missing after insert", id)))?;
    conn.close();
    tracing::info!(game_id = id, by = %caller.claims.sub, "game added");
    Ok(success_one(game))
}

pub async fn update_game(
    State(state): State<AppState>,
    caller: RequireAdmin,
    Path(id): Path<String>,
    Json(patch): Json<GamePatch>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    check_game_fields(patch.name.as_deref(), patch.url.as_deref(), patch.author.as_deref())?;

    let mut conn = Connection::acquire(&state.pool).await?;
    if games::update_game(&mut conn, id, &patch, caller.claims.is_admin).await? {
        tracing::info!(game_id = id, by = %caller.claims.sub, "game updated");
    }
    let game = games::get_game(&mut conn, id, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("game {}", id)))?;
    conn.close();
    Ok(success_one_ok(game))
}
