//! HTTP handlers for UCF payments and balances

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::sales::DateRangeQuery;
use crate::error::AppResult;
use crate::models::{CounterpartyBalance, DailyBalance, RecordPayment, UcfPayment};
use crate::services::settlement::{
    BalanceReport, PaymentFilter, SaveBalanceInput, SettlementService,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DailyBalanceQuery {
    pub opening_balance: Option<Decimal>,
}

/// Record a payment to or receipt from UCF
pub async fn record_payment(
    State(state): State<AppState>,
    Json(input): Json<RecordPayment>,
) -> AppResult<Json<UcfPayment>> {
    let service = SettlementService::new(state.db);
    let payment = service.record_payment(input).await?;
    Ok(Json(payment))
}

/// List payments, newest first
pub async fn list_payments(
    State(state): State<AppState>,
    Query(filter): Query<PaymentFilter>,
) -> AppResult<Json<Vec<UcfPayment>>> {
    let service = SettlementService::new(state.db);
    let payments = service.list_payments(&filter).await?;
    Ok(Json(payments))
}

/// Balance owed to UCF
pub async fn get_counterparty_balance(
    State(state): State<AppState>,
) -> AppResult<Json<CounterpartyBalance>> {
    let service = SettlementService::new(state.db);
    let balance = service.counterparty_balance().await?;
    Ok(Json(balance))
}

/// Balance report; all time unless a date bound is given
pub async fn get_balance_report(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<BalanceReport>> {
    let range = if query.start_date.is_some() || query.end_date.is_some() {
        Some(query.resolve(state.config.reporting.default_window_days)?)
    } else {
        None
    };
    let service = SettlementService::new(state.db);
    let report = service.balance_report(range).await?;
    Ok(Json(report))
}

/// Live rollup for a date
pub async fn get_daily_balance(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Query(query): Query<DailyBalanceQuery>,
) -> AppResult<Json<DailyBalance>> {
    let service = SettlementService::new(state.db);
    let balance = service.daily_balance(date, query.opening_balance).await?;
    Ok(Json(balance))
}

/// Last saved rollup for a date
pub async fn get_saved_daily_balance(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<DailyBalance>> {
    let service = SettlementService::new(state.db);
    let balance = service.saved_daily_balance(date).await?;
    Ok(Json(balance))
}

/// Recompute and store the rollup for a date
pub async fn save_daily_balance(
    State(state): State<AppState>,
    Json(input): Json<SaveBalanceInput>,
) -> AppResult<Json<DailyBalance>> {
    let service = SettlementService::new(state.db);
    let balance = service.save_daily_balance(input).await?;
    Ok(Json(balance))
}
