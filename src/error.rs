//! Typed errors and HTTP mapping.

use crate::sql::BuildError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("dependency: {0}")]
    Dependency(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Build(_) | AppError::Db(_) | AppError::Dependency(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// A `UNIQUE` constraint rejected the write.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, AppError::Db(sqlx::Error::Database(e)) if e.is_unique_violation())
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Build(_) => "query_error",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::Db(sqlx::Error::RowNotFound) => "not_found",
            AppError::Db(_) => "database_error",
            AppError::Dependency(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let body = if status.is_server_error() {
            let correlation_id = uuid::Uuid::new_v4();
            tracing::error!(correlation_id = %correlation_id, error = %self, "request failed");
            ErrorBody {
                error: ErrorDetail {
                    code: code.to_string(),
                    message: "internal error".to_string(),
                    details: Some(serde_json::json!({ "correlationId": correlation_id })),
                },
            }
        } else {
            ErrorBody {
                error: ErrorDetail {
                    code: code.to_string(),
                    message: self.to_string(),
                    details: None,
                },
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthenticated("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("taken".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Validation("bad".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::Db(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Dependency("bcrypt".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unique_violation_detection() {
        assert!(crate::store::testing::duplicate_entry().is_unique_violation());
        assert!(!AppError::Db(sqlx::Error::RowNotFound).is_unique_violation());
        assert!(!AppError::Conflict("taken".into()).is_unique_violation());
    }

    #[tokio::test]
    async fn test_server_errors_hide_detail() {
        let res = AppError::Dependency("SELECT phash FROM users".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["message"], "internal error");
        assert!(body["error"]["details"]["correlationId"].is_string());
        assert!(!String::from_utf8_lossy(&bytes).contains("phash"));
    }
}
