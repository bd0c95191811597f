//! Filing reports, and the admin report queue.

use crate::error::AppError;
use crate::extractors::{NeedsReport, RequireAdmin, RequireUser};
use crate::response::{success_many, success_one};
use crate::service::reports::{self, NewReport, ReportFilter, ReportType};
use crate::service::{parse_id, FieldRule, RequestValidator, LONG_TEXT};
use crate::state::AppState;
use crate::store::Connection;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

const REPORT_TEXT: FieldRule = FieldRule {
    required: true,
    ..LONG_TEXT
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub report_type: ReportType,
    pub target_id: i64,
    pub report: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub report_type: Option<ReportType>,
    pub answered: Option<bool>,
}

pub async fn create_report(
    State(state): State<AppState>,
    caller: RequireUser<NeedsReport>,
    Json(body): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    RequestValidator::check("report", Some(body.report.as_str()), &REPORT_TEXT)?;
    if body.target_id <= 0 {
        return Err(AppError::BadRequest("invalid target".into()));
    }
    let mut conn = Connection::acquire(&state.pool).await?;
    let id = reports::add_report(
        &mut conn,
        &NewReport {
            report_type: body.report_type,
            target_id: body.target_id,
            reporter_id: caller.claims.user_id()?,
            report: body.report,
        },
    )
    .await?;
    Ok(success_one(serde_json::json!({ "id": id })))
}

pub async fn list_reports(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(q): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ReportFilter {
        report_type: q.report_type,
        answered: q.answered,
    };
    let mut conn = Connection::acquire(&state.pool).await?;
    let rows = reports::get_reports(&mut conn, &filter).await?;
    Ok(success_many(rows))
}

pub async fn answer_report(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let mut conn = Connection::acquire(&state.pool).await?;
    if !reports::answer_report(&mut conn, id, admin.claims.user_id()?, Utc::now()).await? {
        return Err(AppError::NotFound(format!("open report {}", id)));
    }
    tracing::info!(report_id = id, by = %admin.claims.sub, "report answered");
    Ok(StatusCode::NO_CONTENT)
}
