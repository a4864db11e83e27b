//! Reservation (hold queue) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        reservation::{
            CreateReservation, ExpireResult, QueueEntry, ReservationQuery, ReservationStats,
            UpdateReservation,
        },
        BorrowDetails, Page, Reservation, Role,
    },
};

use super::{reader_scope, AuthenticatedUser, PaginatedResponse};

/// List reservations
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations", body = PaginatedResponse<Reservation>)
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<ReservationQuery>,
) -> AppResult<Json<PaginatedResponse<Reservation>>> {
    if claims.role != Role::Reader {
        claims.require_librarian()?;
    }
    query.reader_id = reader_scope(&claims, query.reader_id)?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.reservations.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a reservation
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = Reservation),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.get(id).await?;
    claims.require_reader_access(reservation.reader_id)?;
    Ok(Json(reservation))
}

/// Reserve a book
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation queued", body = Reservation),
        (status = 409, description = "Reader already has an active reservation for this book"),
        (status = 422, description = "Copies are on the shelf or membership is not active")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    claims.require_reader_access(data.reader_id)?;

    let reservation = state.services.reservations.create(&data).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Update reservation notes
#[utoipa::path(
    put,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = UpdateReservation,
    responses(
        (status = 200, description = "Reservation updated", body = Reservation),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn update_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateReservation>,
) -> AppResult<Json<Reservation>> {
    claims.require_librarian()?;

    let reservation = state.services.reservations.update(id, &data).await?;
    Ok(Json(reservation))
}

/// Delete a reservation
#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 204, description = "Reservation deleted"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn delete_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.reservations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancel a pending or ready reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 422, description = "Reservation is no longer active")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.get(id).await?;
    claims.require_reader_access(reservation.reader_id)?;

    let reservation = state.services.reservations.cancel(id).await?;
    Ok(Json(reservation))
}

/// Lend the held copy to the reservation's reader
#[utoipa::path(
    post,
    path = "/reservations/{id}/fulfill",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 201, description = "Ticket opened", body = BorrowDetails),
        (status = 404, description = "Reservation not found"),
        (status = 422, description = "Reservation is not ready for pickup")
    )
)]
pub async fn fulfill_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<BorrowDetails>)> {
    claims.require_librarian()?;

    let borrow = state.services.reservations.fulfil(id, Some(claims.user_id)).await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Expire holds that were not picked up in time
#[utoipa::path(
    post,
    path = "/reservations/expire",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Expired holds and newly ready reservations", body = ExpireResult)
    )
)]
pub async fn expire_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ExpireResult>> {
    claims.require_librarian()?;

    let result = state.services.reservations.expire().await?;
    Ok(Json(result))
}

/// Reservation queue of a book
#[utoipa::path(
    get,
    path = "/books/{id}/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Active reservations in queue order", body = Vec<QueueEntry>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_queue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Vec<QueueEntry>>> {
    claims.require_librarian()?;

    let queue = state.services.reservations.queue(book_id).await?;
    Ok(Json(queue))
}

/// Reservation statistics
#[utoipa::path(
    get,
    path = "/reservations/stats",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservation statistics", body = ReservationStats)
    )
)]
pub async fn reservation_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ReservationStats>> {
    claims.require_librarian()?;

    let stats = state.services.reservations.stats().await?;
    Ok(Json(stats))
}
