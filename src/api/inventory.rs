//! Stock position endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        inventory::{InventoryStats, StockAdjustment, StockLevel, StockQuery},
        Page,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Stock levels of every title
#[utoipa::path(
    get,
    path = "/inventory",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(StockQuery),
    responses(
        (status = 200, description = "Stock levels", body = PaginatedResponse<StockLevel>)
    )
)]
pub async fn list_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<PaginatedResponse<StockLevel>>> {
    claims.require_warehouse()?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.inventory.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Stock level of a title
#[utoipa::path(
    get,
    path = "/inventory/books/{id}",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Stock level", body = StockLevel),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<StockLevel>> {
    claims.require_warehouse()?;

    let level = state.services.inventory.get(book_id).await?;
    Ok(Json(level))
}

/// Titles at or below the low-stock threshold
#[utoipa::path(
    get,
    path = "/inventory/low-stock",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(StockQuery),
    responses(
        (status = 200, description = "Low-stock titles", body = PaginatedResponse<StockLevel>)
    )
)]
pub async fn low_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<PaginatedResponse<StockLevel>>> {
    claims.require_warehouse()?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.inventory.low_stock(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Add or write off copies of a title
#[utoipa::path(
    post,
    path = "/inventory/books/{id}/adjust",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Adjusted stock level", body = StockLevel),
        (status = 400, description = "Invalid adjustment"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Not enough copies on the shelf")
    )
)]
pub async fn adjust_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(data): Json<StockAdjustment>,
) -> AppResult<Json<StockLevel>> {
    claims.require_warehouse()?;
    data.validate()?;

    let level = state.services.inventory.adjust(book_id, &data).await?;
    Ok(Json(level))
}

/// Inventory statistics
#[utoipa::path(
    get,
    path = "/inventory/stats",
    tag = "inventory",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Inventory statistics", body = InventoryStats)
    )
)]
pub async fn inventory_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<InventoryStats>> {
    claims.require_warehouse()?;

    let stats = state.services.inventory.stats().await?;
    Ok(Json(stats))
}
