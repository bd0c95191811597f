//! User reports about games, reviews or other users, answered by admins.

use crate::error::AppError;
use crate::sql::{InsertList, QueryBuf, SqlParam, UpdateList, WhereList};
use crate::store::{from_rows, Database};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Game,
    Review,
    User,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Game => "game",
            ReportType::Review => "review",
            ReportType::User => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Report {
    pub id: i64,
    pub report_type: ReportType,
    pub target_id: i64,
    pub reporter_id: i64,
    pub report: String,
    pub answered_by_id: Option<i64>,
    pub date_answered: Option<String>,
    pub date_created: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub report_type: ReportType,
    pub target_id: i64,
    pub reporter_id: i64,
    pub report: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub report_type: Option<ReportType>,
    /// `Some(false)` lists the open queue.
    pub answered: Option<bool>,
}

pub async fn add_report(db: &mut dyn Database, report: &NewReport) -> Result<i64, AppError> {
    let mut cols = InsertList::new();
    cols.add("report_type", report.report_type.as_str());
    cols.add("target_id", report.target_id);
    cols.add("reporter_id", report.reporter_id);
    cols.add_direct("report", &report.report);
    let q = cols.into_insert("reports")?;
    let res = db.execute(&q.sql, &q.params).await?;
    tracing::info!(report_id = res.insert_id, kind = report.report_type.as_str(), "report filed");
    Ok(res.insert_id as i64)
}

pub async fn get_reports(db: &mut dyn Database, f: &ReportFilter) -> Result<Vec<Report>, AppError> {
    let mut filter = WhereList::new();
    filter.add("report_type", f.report_type.map(ReportType::as_str));
    match f.answered {
        Some(true) => filter.add_phrase("answered_by_id IS NOT NULL", Vec::<SqlParam>::new())?,
        Some(false) => filter.add_phrase("answered_by_id IS NULL", Vec::<SqlParam>::new())?,
        None => {}
    }
    let w = filter.render();
    let mut q = QueryBuf::new(format!(
        "SELECT id, report_type, target_id, reporter_id, report, answered_by_id, date_answered, \
         date_created FROM reports {} ORDER BY date_created DESC, id DESC",
        w.sql
    ));
    q.params = w.params;
    let rows = db.query(&q.sql, &q.params).await?;
    from_rows(rows)
}

/// Answer an open report. Already-answered reports are left untouched and
/// `false` is returned.
pub async fn answer_report(
    db: &mut dyn Database,
    id: i64,
    admin_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let mut set = UpdateList::new();
    set.add("answered_by_id", Some(admin_id));
    set.add("date_answered", Some(now.format("%Y-%m-%d %H:%M:%S").to_string()));

    let mut target = WhereList::new();
    target.add("id", id);
    target.add_phrase("answered_by_id IS NULL", Vec::<SqlParam>::new())?;
    let Some(q) = set.into_update("reports", target)? else {
        return Ok(false);
    };
    let res = db.execute(&q.sql, &q.params).await?;
    Ok(res.affected_rows > 0)
}
