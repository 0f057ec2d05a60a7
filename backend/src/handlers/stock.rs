//! HTTP handlers for stock levels and the stock audit trail

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Stock;
use crate::services::stock::{
    AdjustStockInput, CreateStockInput, StockCreated, StockHistoryView, StockService,
    StockUpdateOutcome, StockView, UpdateStockInput,
};
use crate::AppState;
use shared::ledger::HistoryFilter;

/// List stock levels
pub async fn list_stocks(State(state): State<AppState>) -> AppResult<Json<Vec<StockView>>> {
    let service = StockService::new(state.db);
    let stocks = service.list_stocks().await?;
    Ok(Json(stocks))
}

/// Get a stock row
pub async fn get_stock(
    State(state): State<AppState>,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<Stock>> {
    let service = StockService::new(state.db);
    let stock = service.get_stock(stock_id).await?;
    Ok(Json(stock))
}

/// Create the stock row for a depot/product pair
pub async fn create_stock(
    State(state): State<AppState>,
    Json(input): Json<CreateStockInput>,
) -> AppResult<Json<StockCreated>> {
    let service = StockService::new(state.db);
    let created = service.create_stock(input).await?;
    Ok(Json(created))
}

/// Set the quantity of a stock row
pub async fn update_stock(
    State(state): State<AppState>,
    Path(stock_id): Path<Uuid>,
    Json(input): Json<UpdateStockInput>,
) -> AppResult<Json<StockUpdateOutcome>> {
    let service = StockService::new(state.db);
    let outcome = service.update_stock(stock_id, input).await?;
    Ok(Json(outcome))
}

/// Add to or take from a stock row
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(stock_id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<StockUpdateOutcome>> {
    let service = StockService::new(state.db);
    let outcome = service.adjust_stock(stock_id, input).await?;
    Ok(Json(outcome))
}

/// Stock history, newest first
pub async fn get_stock_history(
    State(state): State<AppState>,
    Query(filter): Query<HistoryFilter>,
) -> AppResult<Json<Vec<StockHistoryView>>> {
    let service = StockService::new(state.db);
    let history = service.get_history(&filter).await?;
    Ok(Json(history))
}

/// History of one stock row, newest first
pub async fn get_history_for_stock(
    State(state): State<AppState>,
    Path(stock_id): Path<Uuid>,
    Query(filter): Query<HistoryFilter>,
) -> AppResult<Json<Vec<StockHistoryView>>> {
    let service = StockService::new(state.db);
    let filter = HistoryFilter {
        stock_id: Some(stock_id),
        ..filter
    };
    let history = service.get_history(&filter).await?;
    Ok(Json(history))
}
