//! Server: reads settings from the environment, applies the schema, mounts the
//! common and `/api/v1` routes.

use axum::Router;
use delicious_fruit::{api_routes, apply_migrations, common_routes_with_ready, AppConfig, AppState, Auth};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("delicious_fruit=info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    apply_migrations(&pool).await?;

    let state = AppState::new(pool, Arc::new(Auth::new(config.auth.clone())));

    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api/v1", api_routes(state))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
