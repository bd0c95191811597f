//! Resource routes mounted under `/api/v1`. Every route passes through
//! `auth_layer`; the handler's extractor picks the guard.

use crate::extractors::auth_layer;
use crate::handlers::{auth, games, messages, reports, reviews, users};
use crate::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/users/:id", get(users::get_user).patch(users::update_user))
        .route("/games", get(games::list_games).post(games::create_game))
        .route("/games/:id", get(games::get_game).patch(games::update_game))
        .route(
            "/games/:id/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route("/reviews/:id", patch(reviews::update_review))
        .route("/messages", post(messages::send_message))
        .route("/messages/inbox", get(messages::inbox))
        .route("/messages/:id/read", patch(messages::mark_read))
        .route("/reports", get(reports::list_reports).post(reports::create_report))
        .route("/reports/:id", patch(reports::answer_report))
        .layer(from_fn_with_state(state.auth.clone(), auth_layer))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Auth, Permission};
    use crate::config::AuthConfig;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use sqlx::mysql::MySqlPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    // Nothing here reaches the database: every request is rejected by a guard
    // or by path parsing before a connection is acquired.
    fn app() -> (Router, Arc<Auth>) {
        let pool = MySqlPoolOptions::new()
            .connect_lazy("mysql://nobody@127.0.0.1:1/none")
            .unwrap();
        let auth = Arc::new(Auth::new(AuthConfig::with_secret("routes-test")));
        (api_routes(AppState::new(pool, auth.clone())), auth)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut b = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        b.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_submissions_require_login() {
        let (app, _) = app();
        let res = app
            .oneshot(request("POST", "/games", None, r#"{"name":"x"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_submit_permission_enforced() {
        let (app, auth) = app();
        let token = auth
            .get_token_with_perms("kayin", 3, false, &[Permission::CanReview])
            .unwrap();
        let res = app
            .oneshot(request("POST", "/games", Some(&token), r#"{"name":"x"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_report_queue_is_admin_only() {
        let (app, auth) = app();
        let token = auth
            .get_token_with_perms("kayin", 3, false, &[Permission::CanReport])
            .unwrap();
        let res = app
            .clone()
            .oneshot(request("GET", "/reports", Some(&token), ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .oneshot(request("PATCH", "/reports/1", None, ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_path_id_is_bad_request() {
        let (app, _) = app();
        let res = app
            .oneshot(request("GET", "/games/abc", None, ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_editing_someone_else_is_forbidden() {
        let (app, auth) = app();
        let token = auth.get_token("kayin", 3, false).unwrap();
        let res = app
            .oneshot(request("PATCH", "/users/4", Some(&token), r#"{"bio":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
