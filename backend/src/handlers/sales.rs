//! HTTP handlers for recording and listing sales

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{DailySale, RecordSale, SaleOutcome};
use crate::services::sales::{SalesListing, SalesService};
use crate::AppState;
use shared::DateRange;

/// Optional date bounds; missing bounds fall back to the configured report window
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRangeQuery {
    pub fn resolve(&self, default_days: i64) -> AppResult<DateRange> {
        DateRange::resolve(
            self.start_date,
            self.end_date,
            Utc::now().date_naive(),
            default_days,
        )
        .map_err(|msg| AppError::Validation {
            field: "start_date".to_string(),
            message: msg.to_string(),
        })
    }
}

/// Record a sale
pub async fn record_sale(
    State(state): State<AppState>,
    Json(input): Json<RecordSale>,
) -> AppResult<Json<SaleOutcome>> {
    let service = SalesService::new(state.db);
    let outcome = service.record_sale(input).await?;
    Ok(Json(outcome))
}

/// Get a daily sale row
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<DailySale>> {
    let service = SalesService::new(state.db);
    let sale = service.get_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Sales in a date range with totals
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<SalesListing>> {
    let range = query.resolve(state.config.reporting.default_window_days)?;
    let service = SalesService::new(state.db);
    let listing = service.list_sales(range).await?;
    Ok(Json(listing))
}
