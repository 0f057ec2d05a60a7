//! Reporting handlers for the dashboard and sales report downloads

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::reporting::{DashboardMetrics, ReportingService};
use crate::services::sales::SalesService;
use crate::AppState;
use shared::report::SalesReport;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub format: Option<String>, // "json", "text" or "csv"
}

/// Get dashboard metrics
pub async fn get_dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardMetrics>> {
    let service = ReportingService::new(state.db.clone());
    let metrics = service.get_dashboard_metrics().await?;
    Ok(Json(metrics))
}

/// Get the sales report as JSON, fixed-column text or CSV
pub async fn get_sales_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let range = super::sales::DateRangeQuery {
        start_date: query.start_date,
        end_date: query.end_date,
    }
    .resolve(state.config.reporting.default_window_days)?;

    let report: SalesReport = SalesService::new(state.db.clone()).sales_report(range).await?;

    match query.format.as_deref() {
        Some("text") | Some("txt") => {
            let reporting = &state.config.reporting;
            let body = report.render_text(&reporting.company_name, &reporting.currency_symbol);
            Ok((
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", report.filename("txt")),
                    ),
                ],
                body,
            )
                .into_response())
        }
        Some("csv") => {
            let csv = ReportingService::export_to_csv(&report.rows)?;
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", report.filename("csv")),
                    ),
                ],
                csv,
            )
                .into_response())
        }
        _ => Ok(Json(report).into_response()),
    }
}
