//! Database collaborator: run `?`-parameterized statements and map rows to JSON
//! objects that domain structs deserialize from.

use crate::error::AppError;
use crate::sql::{count_placeholders, SqlParam};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool};

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub affected_rows: u64,
    pub insert_id: u64,
}

/// What data access functions need from a database.
#[async_trait]
pub trait Database: Send {
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, AppError>;

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<ExecResult, AppError>;
}

/// A pooled connection held for the length of one data-access operation. It
/// goes back to the pool exactly once: when dropped or on [`Connection::close`].
pub struct Connection {
    conn: PoolConnection<MySql>,
}

impl Connection {
    pub async fn acquire(pool: &MySqlPool) -> Result<Self, AppError> {
        let conn = pool.acquire().await?;
        Ok(Connection { conn })
    }

    pub fn close(self) {}
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[SqlParam],
) -> Query<'q, MySql, MySqlArguments> {
    for p in params {
        query = match p {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Bool(b) => query.bind(*b),
            SqlParam::Int(n) => query.bind(*n),
            SqlParam::Float(f) => query.bind(*f),
            SqlParam::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

#[async_trait]
impl Database for Connection {
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        debug_assert_eq!(count_placeholders(sql), params.len());
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<ExecResult, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "execute");
        debug_assert_eq!(count_placeholders(sql), params.len());
        let res = bind_all(sqlx::query(sql), params)
            .execute(&mut *self.conn)
            .await?;
        Ok(ExecResult {
            affected_rows: res.rows_affected(),
            insert_id: res.last_insert_id(),
        })
    }
}

/// Deserialize a row into a domain struct.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| AppError::Dependency(format!("row mapping: {}", e)))
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, AppError> {
    rows.into_iter().map(from_row).collect()
}

fn row_to_map(row: &MySqlRow) -> Row {
    use sqlx::{Column, Row as _, TypeInfo};
    let mut map = Row::new();
    for col in row.columns() {
        let v = cell_to_value(row, col.ordinal(), col.type_info().name());
        map.insert(col.name().to_string(), v);
    }
    map
}

fn cell_to_value(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    use sqlx::Row as _;
    let value = match type_name {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(idx).ok().flatten().map(Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(idx).ok().flatten().map(Value::from)
        }
        t if t.ends_with("UNSIGNED") => row.try_get::<Option<u64>, _>(idx).ok().flatten().map(Value::from),
        "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.to_rfc3339())),
        "DATETIME" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S").to_string())),
        "JSON" => row.try_get::<Option<Value>, _>(idx).ok().flatten(),
        _ => row.try_get::<Option<String>, _>(idx).ok().flatten().map(Value::String),
    };
    value.unwrap_or(Value::Null)
}
