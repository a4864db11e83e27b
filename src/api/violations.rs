//! Violation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        violation::{CreateViolation, UpdateViolation, ViolationQuery, ViolationStats},
        Page, Violation,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List violations
#[utoipa::path(
    get,
    path = "/violations",
    tag = "violations",
    security(("bearer_auth" = [])),
    params(ViolationQuery),
    responses(
        (status = 200, description = "Violations", body = PaginatedResponse<Violation>)
    )
)]
pub async fn list_violations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ViolationQuery>,
) -> AppResult<Json<PaginatedResponse<Violation>>> {
    claims.require_librarian_or_accountant()?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.violations.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a violation
#[utoipa::path(
    get,
    path = "/violations/{id}",
    tag = "violations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Violation ID")),
    responses(
        (status = 200, description = "Violation", body = Violation),
        (status = 404, description = "Violation not found")
    )
)]
pub async fn get_violation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Violation>> {
    claims.require_librarian_or_accountant()?;

    let violation = state.services.violations.get(id).await?;
    Ok(Json(violation))
}

/// Record a violation and raise its fine
#[utoipa::path(
    post,
    path = "/violations",
    tag = "violations",
    security(("bearer_auth" = [])),
    request_body = CreateViolation,
    responses(
        (status = 201, description = "Violation recorded", body = Violation),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Reader, ticket or book not found")
    )
)]
pub async fn create_violation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateViolation>,
) -> AppResult<(StatusCode, Json<Violation>)> {
    claims.require_librarian()?;
    data.validate()?;

    let violation = state.services.violations.create(&data).await?;
    Ok((StatusCode::CREATED, Json(violation)))
}

/// Update the description of a violation
#[utoipa::path(
    put,
    path = "/violations/{id}",
    tag = "violations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Violation ID")),
    request_body = UpdateViolation,
    responses(
        (status = 200, description = "Violation updated", body = Violation),
        (status = 404, description = "Violation not found")
    )
)]
pub async fn update_violation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateViolation>,
) -> AppResult<Json<Violation>> {
    claims.require_librarian()?;

    let violation = state.services.violations.update(id, &data).await?;
    Ok(Json(violation))
}

/// Delete a violation and cancel its pending fines
#[utoipa::path(
    delete,
    path = "/violations/{id}",
    tag = "violations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Violation ID")),
    responses(
        (status = 204, description = "Violation deleted"),
        (status = 404, description = "Violation not found"),
        (status = 422, description = "Violation already processed")
    )
)]
pub async fn delete_violation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.violations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Close a violation
#[utoipa::path(
    post,
    path = "/violations/{id}/process",
    tag = "violations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Violation ID")),
    responses(
        (status = 200, description = "Violation processed", body = Violation),
        (status = 404, description = "Violation not found"),
        (status = 422, description = "Violation already processed")
    )
)]
pub async fn process_violation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Violation>> {
    claims.require_librarian()?;

    let violation = state.services.violations.process(id).await?;
    Ok(Json(violation))
}

/// Violation statistics
#[utoipa::path(
    get,
    path = "/violations/stats",
    tag = "violations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Violation statistics", body = ViolationStats)
    )
)]
pub async fn violation_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ViolationStats>> {
    claims.require_librarian_or_accountant()?;

    let stats = state.services.violations.stats().await?;
    Ok(Json(stats))
}
