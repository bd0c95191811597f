//! Create the application tables. Every statement is `CREATE TABLE IF NOT EXISTS`,
//! so this is safe to run on every start.

use crate::error::AppError;
use sqlx::MySqlPool;

const SCHEMA: &str = include_str!("../migrations/schema.sql");

fn statements(schema: &str) -> impl Iterator<Item = &str> {
    schema.split(';').map(str::trim).filter(|s| !s.is_empty())
}

pub async fn apply_migrations(pool: &MySqlPool) -> Result<(), AppError> {
    let mut applied = 0;
    for stmt in statements(SCHEMA) {
        sqlx::query(stmt).execute(pool).await?;
        applied += 1;
    }
    tracing::info!(statements = applied, "schema applied");
    Ok(())
}
