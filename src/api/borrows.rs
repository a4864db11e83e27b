//! Circulation endpoints: borrow tickets, returns and renewals

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrow::{BorrowQuery, BorrowStats, BorrowSummary, CreateBorrow, ReturnBorrow, ReturnResult, UpdateBorrow},
        BorrowDetails, Page, Role,
    },
};

use super::{reader_scope, AuthenticatedUser, PaginatedResponse, SweepResponse};

/// List borrow tickets
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Borrow tickets", body = PaginatedResponse<BorrowSummary>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<BorrowQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowSummary>>> {
    if claims.role != Role::Reader {
        claims.require_librarian()?;
    }
    query.reader_id = reader_scope(&claims, query.reader_id)?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.borrows.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a borrow ticket with its lines
#[utoipa::path(
    get,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket details", body = BorrowDetails),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn get_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowDetails>> {
    let borrow = state.services.borrows.get(id).await?;
    claims.require_reader_access(borrow.ticket.reader_id)?;
    Ok(Json(borrow))
}

/// Lend books to a reader
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateBorrow,
    responses(
        (status = 201, description = "Ticket opened", body = BorrowDetails),
        (status = 400, description = "Invalid input"),
        (status = 422, description = "Membership, quota or stock rule violated")
    )
)]
pub async fn create_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBorrow>,
) -> AppResult<(StatusCode, Json<BorrowDetails>)> {
    claims.require_librarian()?;
    data.validate()?;

    let borrow = state.services.borrows.create(&data, Some(claims.user_id)).await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Change the due date or notes of an open ticket
#[utoipa::path(
    put,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    request_body = UpdateBorrow,
    responses(
        (status = 200, description = "Ticket updated", body = BorrowDetails),
        (status = 404, description = "Ticket not found"),
        (status = 422, description = "Ticket already closed")
    )
)]
pub async fn update_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateBorrow>,
) -> AppResult<Json<BorrowDetails>> {
    claims.require_librarian()?;

    let borrow = state.services.borrows.update(id, &data).await?;
    Ok(Json(borrow))
}

/// Delete a ticket whose books are all back
#[utoipa::path(
    delete,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    responses(
        (status = 204, description = "Ticket deleted"),
        (status = 404, description = "Ticket not found"),
        (status = 422, description = "Books still on loan")
    )
)]
pub async fn delete_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.borrows.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Return books of a ticket
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    request_body = ReturnBorrow,
    responses(
        (status = 200, description = "Books returned", body = ReturnResult),
        (status = 404, description = "Ticket not found"),
        (status = 422, description = "Ticket already returned or book not on it")
    )
)]
pub async fn return_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ReturnBorrow>,
) -> AppResult<Json<ReturnResult>> {
    claims.require_librarian()?;

    let result = state.services.borrows.return_books(id, &data).await?;
    Ok(Json(result))
}

/// Extend the due date of a ticket
#[utoipa::path(
    post,
    path = "/borrows/{id}/renew",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket renewed", body = BorrowDetails),
        (status = 404, description = "Ticket not found"),
        (status = 422, description = "Renewal not allowed")
    )
)]
pub async fn renew_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowDetails>> {
    claims.require_librarian()?;

    let borrow = state.services.borrows.renew(id).await?;
    Ok(Json(borrow))
}

/// Flag open tickets past their due date as overdue
#[utoipa::path(
    post,
    path = "/borrows/mark-overdue",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Number of tickets flagged", body = SweepResponse)
    )
)]
pub async fn mark_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepResponse>> {
    claims.require_librarian()?;

    let updated = state.services.borrows.mark_overdue().await?;
    Ok(Json(SweepResponse { updated }))
}

/// Circulation statistics
#[utoipa::path(
    get,
    path = "/borrows/stats",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Circulation statistics", body = BorrowStats)
    )
)]
pub async fn borrow_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BorrowStats>> {
    claims.require_librarian()?;

    let stats = state.services.borrows.stats().await?;
    Ok(Json(stats))
}
