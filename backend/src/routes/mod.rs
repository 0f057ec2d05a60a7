//! Route definitions for the depot ledger API

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/dashboard", get(handlers::get_dashboard))
        .nest("/depots", depot_routes())
        .nest("/products", product_routes())
        .route("/catalog/seed", post(handlers::seed_catalog))
        .nest("/stocks", stock_routes())
        .nest("/sales", sales_routes())
        .nest("/payments", payment_routes())
        .nest("/balances", balance_routes())
        .nest("/reports", report_routes())
}

/// Depot routes
fn depot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_depots).post(handlers::create_depot))
        .route("/:depot_id", get(handlers::get_depot))
}

/// Product routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/:product_id", get(handlers::get_product))
        .route("/:product_id/price", put(handlers::set_product_price))
}

/// Stock ledger routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stocks).post(handlers::create_stock))
        .route("/history", get(handlers::get_stock_history))
        .route(
            "/:stock_id",
            get(handlers::get_stock).put(handlers::update_stock),
        )
        .route("/:stock_id/adjust", post(handlers::adjust_stock))
        .route("/:stock_id/history", get(handlers::get_history_for_stock))
}

/// Sale routes
fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::record_sale))
        .route("/:sale_id", get(handlers::get_sale))
}

/// UCF payment routes
fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_payments).post(handlers::record_payment))
}

/// Balance routes
fn balance_routes() -> Router<AppState> {
    Router::new()
        .route("/counterparty", get(handlers::get_counterparty_balance))
        .route("/report", get(handlers::get_balance_report))
        .route("/daily", post(handlers::save_daily_balance))
        .route("/daily/:date", get(handlers::get_daily_balance))
        .route("/daily/:date/saved", get(handlers::get_saved_daily_balance))
}

/// Report routes
fn report_routes() -> Router<AppState> {
    Router::new().route("/sales", get(handlers::get_sales_report))
}
