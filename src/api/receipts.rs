//! Financial transaction (receipt) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        receipt::{CreateReceipt, ReceiptQuery, ReceiptStats, ReceiptStatsQuery, UpdateReceipt},
        Page, Receipt,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List receipts
#[utoipa::path(
    get,
    path = "/receipts",
    tag = "receipts",
    security(("bearer_auth" = [])),
    params(ReceiptQuery),
    responses(
        (status = 200, description = "Receipts", body = PaginatedResponse<Receipt>)
    )
)]
pub async fn list_receipts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReceiptQuery>,
) -> AppResult<Json<PaginatedResponse<Receipt>>> {
    claims.require_accountant()?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.receipts.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a receipt
#[utoipa::path(
    get,
    path = "/receipts/{id}",
    tag = "receipts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Receipt", body = Receipt),
        (status = 404, description = "Receipt not found")
    )
)]
pub async fn get_receipt(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Receipt>> {
    claims.require_accountant()?;

    let receipt = state.services.receipts.get(id).await?;
    Ok(Json(receipt))
}

/// Create a pending receipt
#[utoipa::path(
    post,
    path = "/receipts",
    tag = "receipts",
    security(("bearer_auth" = [])),
    request_body = CreateReceipt,
    responses(
        (status = 201, description = "Receipt created", body = Receipt),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Reader or violation not found")
    )
)]
pub async fn create_receipt(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateReceipt>,
) -> AppResult<(StatusCode, Json<Receipt>)> {
    claims.require_accountant()?;
    data.validate()?;

    let receipt = state.services.receipts.create(&data).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Correct a pending receipt
#[utoipa::path(
    put,
    path = "/receipts/{id}",
    tag = "receipts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    request_body = UpdateReceipt,
    responses(
        (status = 200, description = "Receipt updated", body = Receipt),
        (status = 404, description = "Receipt not found"),
        (status = 422, description = "Receipt is no longer pending")
    )
)]
pub async fn update_receipt(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateReceipt>,
) -> AppResult<Json<Receipt>> {
    claims.require_accountant()?;

    let receipt = state.services.receipts.update(id, &data).await?;
    Ok(Json(receipt))
}

/// Delete an uncollected receipt
#[utoipa::path(
    delete,
    path = "/receipts/{id}",
    tag = "receipts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    responses(
        (status = 204, description = "Receipt deleted"),
        (status = 404, description = "Receipt not found"),
        (status = 422, description = "Receipt already collected")
    )
)]
pub async fn delete_receipt(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_accountant()?;

    state.services.receipts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Collect a pending receipt
#[utoipa::path(
    post,
    path = "/receipts/{id}/collect",
    tag = "receipts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Receipt collected", body = Receipt),
        (status = 404, description = "Receipt not found"),
        (status = 422, description = "Receipt is not pending")
    )
)]
pub async fn collect_receipt(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Receipt>> {
    claims.require_accountant()?;

    let receipt = state.services.receipts.collect(id, claims.user_id).await?;
    Ok(Json(receipt))
}

/// Cancel a pending receipt
#[utoipa::path(
    post,
    path = "/receipts/{id}/cancel",
    tag = "receipts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Receipt cancelled", body = Receipt),
        (status = 404, description = "Receipt not found"),
        (status = 422, description = "Receipt is not pending")
    )
)]
pub async fn cancel_receipt(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Receipt>> {
    claims.require_accountant()?;

    let receipt = state.services.receipts.cancel(id).await?;
    Ok(Json(receipt))
}

/// Collection statistics for a period
#[utoipa::path(
    get,
    path = "/receipts/stats",
    tag = "receipts",
    security(("bearer_auth" = [])),
    params(ReceiptStatsQuery),
    responses(
        (status = 200, description = "Receipt statistics", body = ReceiptStats)
    )
)]
pub async fn receipt_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReceiptStatsQuery>,
) -> AppResult<Json<ReceiptStats>> {
    claims.require_accountant()?;

    let stats = state.services.receipts.stats(query.from, query.to).await?;
    Ok(Json(stats))
}
