//! Reviews for a game, and review edits by their author or an admin.

use crate::error::AppError;
use crate::extractors::{NeedsReview, OptionalUser, RequireUser};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::games;
use crate::service::reviews::{self, NewReview, ReviewFilter, ReviewPatch, DIFFICULTY_MAX, RATING_MAX};
use crate::service::{parse_id, RequestValidator, LONG_TEXT};
use crate::state::AppState;
use crate::store::Connection;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub comment: Option<String>,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
}

fn check_scores(comment: Option<&str>, rating: Option<f64>, difficulty: Option<f64>) -> Result<(), AppError> {
    RequestValidator::check("comment", comment, &LONG_TEXT)?;
    RequestValidator::check_range("rating", rating, 0.0, RATING_MAX)?;
    RequestValidator::check_range("difficulty", difficulty, 0.0, DIFFICULTY_MAX)?;
    Ok(())
}

pub async fn list_reviews(
    State(state): State<AppState>,
    user: OptionalUser,
    Path(game_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let game_id = parse_id(&game_id)?;
    let mut conn = Connection::acquire(&state.pool).await?;
    if games::get_game(&mut conn, game_id, user.is_admin()).await?.is_none() {
        return Err(AppError::NotFound(format!("game {}", game_id)));
    }
    let filter = ReviewFilter {
        game_id: Some(game_id),
        ..Default::default()
    };
    let rows = reviews::get_reviews(&mut conn, &filter).await?;
    conn.close();
    Ok(success_many(rows))
}

pub async fn create_review(
    State(state): State<AppState>,
    caller: RequireUser<NeedsReview>,
    Path(game_id): Path<String>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let game_id = parse_id(&game_id)?;
    check_scores(body.comment.as_deref(), body.rating, body.difficulty)?;
    if body.comment.as_deref().map_or(true, |c| c.trim().is_empty())
        && body.rating.is_none()
        && body.difficulty.is_none()
    {
        return Err(AppError::Validation(
            "a review needs a comment, rating or difficulty".into(),
        ));
    }

    let mut conn = Connection::acquire(&state.pool).await?;
    if games::get_game(&mut conn, game_id, false).await?.is_none() {
        return Err(AppError::NotFound(format!("game {}", game_id)));
    }
    let id = reviews::add_review(
        &mut conn,
        &NewReview {
            game_id,
            user_id: caller.claims.user_id()?,
            comment: body.comment,
            rating: body.rating,
            difficulty: body.difficulty,
        },
    )
    .await?;
    let review = reviews::get_review(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::Dependency(format!("review {} missing after insert", id)))?;
    conn.close();
    Ok(success_one(review))
}

pub async fn update_review(
    State(state): State<AppState>,
    caller: RequireUser,
    Path(id): Path<String>,
    Json(patch): Json<ReviewPatch>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    check_scores(patch.comment.as_deref(), patch.rating, patch.difficulty)?;

    let mut conn = Connection::acquire(&state.pool).await?;
    let existing = reviews::get_review(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("review {}", id)))?;
    let is_admin = caller.claims.is_admin;
    if existing.user_id != caller.claims.user_id()? && !is_admin {
        return Err(AppError::Forbidden("cannot edit another user's review"));
    }
    reviews::update_review(&mut conn, id, &patch, is_admin).await?;
    let review = reviews::get_review(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("review {}", id)))?;
    conn.close();
    Ok(success_one_ok(review))
}
