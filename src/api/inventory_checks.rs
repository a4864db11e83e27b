//! Inventory check (stock count) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        inventory::{
            CreateInventoryCheck, InventoryCheck, InventoryCheckDetails, InventoryCheckQuery,
            InventoryCheckStats, UpdateInventoryCheck,
        },
        Page,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List inventory checks
#[utoipa::path(
    get,
    path = "/inventory-checks",
    tag = "inventory_checks",
    security(("bearer_auth" = [])),
    params(InventoryCheckQuery),
    responses(
        (status = 200, description = "Inventory checks", body = PaginatedResponse<InventoryCheck>)
    )
)]
pub async fn list_checks(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<InventoryCheckQuery>,
) -> AppResult<Json<PaginatedResponse<InventoryCheck>>> {
    claims.require_warehouse()?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.inventory_checks.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get an inventory check with its count lines
#[utoipa::path(
    get,
    path = "/inventory-checks/{id}",
    tag = "inventory_checks",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Inventory check ID")),
    responses(
        (status = 200, description = "Inventory check", body = InventoryCheckDetails),
        (status = 404, description = "Inventory check not found")
    )
)]
pub async fn get_check(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<InventoryCheckDetails>> {
    claims.require_warehouse()?;

    let check = state.services.inventory_checks.get(id).await?;
    Ok(Json(check))
}

/// Start a draft count
#[utoipa::path(
    post,
    path = "/inventory-checks",
    tag = "inventory_checks",
    security(("bearer_auth" = [])),
    request_body = CreateInventoryCheck,
    responses(
        (status = 201, description = "Draft created", body = InventoryCheckDetails),
        (status = 400, description = "Invalid count lines"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_check(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateInventoryCheck>,
) -> AppResult<(StatusCode, Json<InventoryCheckDetails>)> {
    claims.require_warehouse()?;
    data.validate()?;

    let check = state
        .services
        .inventory_checks
        .create(&data, Some(claims.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(check)))
}

/// Edit a draft count
#[utoipa::path(
    put,
    path = "/inventory-checks/{id}",
    tag = "inventory_checks",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Inventory check ID")),
    request_body = UpdateInventoryCheck,
    responses(
        (status = 200, description = "Draft updated", body = InventoryCheckDetails),
        (status = 404, description = "Inventory check not found"),
        (status = 422, description = "Check already completed")
    )
)]
pub async fn update_check(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateInventoryCheck>,
) -> AppResult<Json<InventoryCheckDetails>> {
    claims.require_warehouse()?;

    let check = state.services.inventory_checks.update(id, &data).await?;
    Ok(Json(check))
}

/// Delete a draft count
#[utoipa::path(
    delete,
    path = "/inventory-checks/{id}",
    tag = "inventory_checks",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Inventory check ID")),
    responses(
        (status = 204, description = "Draft deleted"),
        (status = 404, description = "Inventory check not found"),
        (status = 422, description = "Check already completed")
    )
)]
pub async fn delete_check(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_warehouse()?;

    state.services.inventory_checks.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply the counted quantities to stock
#[utoipa::path(
    post,
    path = "/inventory-checks/{id}/complete",
    tag = "inventory_checks",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Inventory check ID")),
    responses(
        (status = 200, description = "Check completed", body = InventoryCheckDetails),
        (status = 404, description = "Inventory check not found"),
        (status = 422, description = "Check already completed")
    )
)]
pub async fn complete_check(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<InventoryCheckDetails>> {
    claims.require_warehouse()?;

    let check = state.services.inventory_checks.complete(id).await?;
    Ok(Json(check))
}

/// Inventory check statistics
#[utoipa::path(
    get,
    path = "/inventory-checks/stats",
    tag = "inventory_checks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Inventory check statistics", body = InventoryCheckStats)
    )
)]
pub async fn check_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<InventoryCheckStats>> {
    claims.require_warehouse()?;

    let stats = state.services.inventory_checks.stats().await?;
    Ok(Json(stats))
}
