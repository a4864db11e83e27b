//! Stock-in (goods received) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        stock_in::{CreateStockIn, StockIn, StockInDetails, StockInQuery, StockInStats, UpdateStockIn},
        Page,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List stock-in receipts
#[utoipa::path(
    get,
    path = "/stock-ins",
    tag = "stock_ins",
    security(("bearer_auth" = [])),
    params(StockInQuery),
    responses(
        (status = 200, description = "Stock-in receipts", body = PaginatedResponse<StockIn>)
    )
)]
pub async fn list_stock_ins(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<StockInQuery>,
) -> AppResult<Json<PaginatedResponse<StockIn>>> {
    claims.require_warehouse()?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.stock_ins.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a stock-in receipt with its lines
#[utoipa::path(
    get,
    path = "/stock-ins/{id}",
    tag = "stock_ins",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Stock-in ID")),
    responses(
        (status = 200, description = "Stock-in details", body = StockInDetails),
        (status = 404, description = "Stock-in not found")
    )
)]
pub async fn get_stock_in(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<StockInDetails>> {
    claims.require_warehouse()?;

    let stock_in = state.services.stock_ins.get(id).await?;
    Ok(Json(stock_in))
}

/// Receive copies from a supplier
#[utoipa::path(
    post,
    path = "/stock-ins",
    tag = "stock_ins",
    security(("bearer_auth" = [])),
    request_body = CreateStockIn,
    responses(
        (status = 201, description = "Stock received", body = StockInDetails),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_stock_in(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateStockIn>,
) -> AppResult<(StatusCode, Json<StockInDetails>)> {
    claims.require_warehouse()?;
    data.validate()?;

    let stock_in = state.services.stock_ins.create(&data, Some(claims.user_id)).await?;
    Ok((StatusCode::CREATED, Json(stock_in)))
}

/// Update supplier or notes of a stock-in
#[utoipa::path(
    put,
    path = "/stock-ins/{id}",
    tag = "stock_ins",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Stock-in ID")),
    request_body = UpdateStockIn,
    responses(
        (status = 200, description = "Stock-in updated", body = StockInDetails),
        (status = 404, description = "Stock-in not found")
    )
)]
pub async fn update_stock_in(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateStockIn>,
) -> AppResult<Json<StockInDetails>> {
    claims.require_warehouse()?;
    data.validate()?;

    let stock_in = state.services.stock_ins.update(id, &data).await?;
    Ok(Json(stock_in))
}

/// Delete a stock-in and take its copies back out of stock
#[utoipa::path(
    delete,
    path = "/stock-ins/{id}",
    tag = "stock_ins",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Stock-in ID")),
    responses(
        (status = 204, description = "Stock-in deleted"),
        (status = 404, description = "Stock-in not found"),
        (status = 422, description = "Received copies are no longer all on the shelf")
    )
)]
pub async fn delete_stock_in(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_warehouse()?;

    state.services.stock_ins.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stock-in statistics
#[utoipa::path(
    get,
    path = "/stock-ins/stats",
    tag = "stock_ins",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Stock-in statistics", body = StockInStats)
    )
)]
pub async fn stock_in_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StockInStats>> {
    claims.require_warehouse()?;

    let stats = state.services.stock_ins.stats().await?;
    Ok(Json(stats))
}
