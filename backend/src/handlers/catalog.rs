//! HTTP handlers for depots and products

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Depot, Product};
use crate::services::catalog::{
    CatalogService, DepotInput, ProductInput, SeedSummary, SetPriceInput, Upserted,
};
use crate::AppState;

/// List depots
pub async fn list_depots(State(state): State<AppState>) -> AppResult<Json<Vec<Depot>>> {
    let service = CatalogService::new(state.db);
    let depots = service.list_depots().await?;
    Ok(Json(depots))
}

/// Get a depot
pub async fn get_depot(
    State(state): State<AppState>,
    Path(depot_id): Path<Uuid>,
) -> AppResult<Json<Depot>> {
    let service = CatalogService::new(state.db);
    let depot = service.get_depot(depot_id).await?;
    Ok(Json(depot))
}

/// Create a depot, or return the existing one with the same name
pub async fn create_depot(
    State(state): State<AppState>,
    Json(input): Json<DepotInput>,
) -> AppResult<Json<Upserted<Depot>>> {
    let service = CatalogService::new(state.db);
    let depot = service.create_depot(input).await?;
    Ok(Json(depot))
}

/// List products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.db);
    let products = service.list_products().await?;
    Ok(Json(products))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Create a product, or return the existing one with the same name
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> AppResult<Json<Upserted<Product>>> {
    let service = CatalogService::new(state.db);
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// Change the price and commission of a product
pub async fn set_product_price(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<SetPriceInput>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.db);
    let product = service.set_product_price(product_id, input).await?;
    Ok(Json(product))
}

/// Apply the initial catalog
pub async fn seed_catalog(State(state): State<AppState>) -> AppResult<Json<SeedSummary>> {
    let service = CatalogService::new(state.db);
    let summary = service.seed_initial_data().await?;
    Ok(Json(summary))
}
