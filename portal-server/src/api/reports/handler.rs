//! Report API Handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::reports::OrderReport;
use crate::utils::{time, AppError, AppResult};

/// Query params for report building; both dates are inclusive calendar
/// dates in the business timezone.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub start_date: String,
    pub end_date: String,
}

/// GET /api/reports - build the full report for a date range
pub async fn build(
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<OrderReport>> {
    let tz = state.config.timezone;
    let start = time::parse_date(&query.start_date)?;
    let end = time::parse_date(&query.end_date)?;
    if end < start {
        return Err(AppError::validation(format!(
            "endDate {} precedes startDate {}",
            query.end_date, query.start_date
        )));
    }

    // Normalize to [midnight(start), midnight(end + 1 day)).
    let start_ms = time::day_start_millis(start, tz);
    let end_ms = time::day_end_millis(end, tz);

    let report = state.reports.build_report(start_ms, end_ms).await?;
    Ok(Json(report))
}
