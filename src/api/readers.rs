//! Reader (library member) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrow::{BorrowQuery, BorrowSummary},
        reader::{CreateReader, MembershipRequest, Reader, ReaderQuery, ReaderStats, UpdateReader},
        receipt::Receipt,
        violation::ReaderFines,
        Page, Role,
    },
};

use super::{AuthenticatedUser, PaginatedResponse, SweepResponse};

/// List readers
#[utoipa::path(
    get,
    path = "/readers",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(ReaderQuery),
    responses(
        (status = 200, description = "Readers", body = PaginatedResponse<Reader>),
        (status = 403, description = "Librarian only")
    )
)]
pub async fn list_readers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReaderQuery>,
) -> AppResult<Json<PaginatedResponse<Reader>>> {
    claims.require_librarian()?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.readers.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a reader by ID
#[utoipa::path(
    get,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    responses(
        (status = 200, description = "Reader", body = Reader),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn get_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reader>> {
    claims.require_reader_access(id)?;

    let reader = state.services.readers.get(id).await?;
    Ok(Json(reader))
}

/// Register a reader
#[utoipa::path(
    post,
    path = "/readers",
    tag = "readers",
    security(("bearer_auth" = [])),
    request_body = CreateReader,
    responses(
        (status = 201, description = "Reader created", body = Reader),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateReader>,
) -> AppResult<(StatusCode, Json<Reader>)> {
    claims.require_librarian()?;
    data.validate()?;

    let reader = state.services.readers.create(&data).await?;
    Ok((StatusCode::CREATED, Json(reader)))
}

/// Update a reader
#[utoipa::path(
    put,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    request_body = UpdateReader,
    responses(
        (status = 200, description = "Reader updated", body = Reader),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn update_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateReader>,
) -> AppResult<Json<Reader>> {
    claims.require_librarian()?;
    data.validate()?;

    let reader = state.services.readers.update(id, &data).await?;
    Ok(Json(reader))
}

/// Delete a reader
#[utoipa::path(
    delete,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    responses(
        (status = 204, description = "Reader deleted"),
        (status = 404, description = "Reader not found"),
        (status = 422, description = "Reader still has books on loan")
    )
)]
pub async fn delete_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.readers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Issue a membership-fee receipt for a reader
#[utoipa::path(
    post,
    path = "/readers/{id}/membership",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    request_body = MembershipRequest,
    responses(
        (status = 201, description = "Pending membership-fee receipt", body = Receipt),
        (status = 404, description = "Reader not found"),
        (status = 422, description = "Reader is locked")
    )
)]
pub async fn request_membership(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<MembershipRequest>,
) -> AppResult<(StatusCode, Json<Receipt>)> {
    claims.require_librarian()?;
    data.validate()?;

    let receipt = state.services.readers.request_membership(id, &data).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Lock a reader's membership
#[utoipa::path(
    post,
    path = "/readers/{id}/lock",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    responses(
        (status = 200, description = "Reader locked", body = Reader),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn lock_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reader>> {
    claims.require_librarian()?;

    let reader = state.services.readers.lock(id).await?;
    Ok(Json(reader))
}

/// Unlock a reader's membership
#[utoipa::path(
    post,
    path = "/readers/{id}/unlock",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    responses(
        (status = 200, description = "Reader unlocked", body = Reader),
        (status = 404, description = "Reader not found"),
        (status = 422, description = "Reader is not locked")
    )
)]
pub async fn unlock_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reader>> {
    claims.require_librarian()?;

    let reader = state.services.readers.unlock(id).await?;
    Ok(Json(reader))
}

/// Mark paid memberships past their expiry date as expired
#[utoipa::path(
    post,
    path = "/readers/expire-memberships",
    tag = "readers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Number of memberships expired", body = SweepResponse)
    )
)]
pub async fn expire_memberships(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepResponse>> {
    claims.require_librarian()?;

    let updated = state.services.readers.expire_memberships().await?;
    Ok(Json(SweepResponse { updated }))
}

/// Borrow tickets of a reader
#[utoipa::path(
    get,
    path = "/readers/{id}/borrows",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID"), BorrowQuery),
    responses(
        (status = 200, description = "Borrow tickets", body = PaginatedResponse<BorrowSummary>),
        (status = 403, description = "Not this reader's records")
    )
)]
pub async fn reader_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(mut query): Query<BorrowQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowSummary>>> {
    claims.require_reader_access(id)?;

    query.reader_id = Some(id);
    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.borrows.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Violations and fine balance of a reader
#[utoipa::path(
    get,
    path = "/readers/{id}/fines",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reader ID")),
    responses(
        (status = 200, description = "Fine balance", body = ReaderFines),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn reader_fines(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReaderFines>> {
    if claims.role != Role::Accountant {
        claims.require_reader_access(id)?;
    }

    let fines = state.services.readers.fines(id).await?;
    Ok(Json(fines))
}

/// Reader statistics
#[utoipa::path(
    get,
    path = "/readers/stats",
    tag = "readers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reader statistics", body = ReaderStats)
    )
)]
pub async fn reader_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ReaderStats>> {
    claims.require_librarian()?;

    let stats = state.services.readers.stats().await?;
    Ok(Json(stats))
}
