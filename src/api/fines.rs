//! Fine endpoints (fine receipts)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        receipt::{ReceiptStats, ReceiptStatsQuery, UpdateReceipt},
        violation::{CreateFine, FineAssessment, FineListQuery, FineQuery},
        Page, Receipt, Role,
    },
};

use super::{reader_scope, AuthenticatedUser, PaginatedResponse};

/// List fine receipts
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineListQuery),
    responses(
        (status = 200, description = "Fine receipts", body = PaginatedResponse<Receipt>)
    )
)]
pub async fn list_fines(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<FineListQuery>,
) -> AppResult<Json<PaginatedResponse<Receipt>>> {
    if claims.role != Role::Reader {
        claims.require_accountant()?;
    }
    query.reader_id = reader_scope(&claims, query.reader_id)?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.fines.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a fine receipt
#[utoipa::path(
    get,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Fine receipt", body = Receipt),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn get_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Receipt>> {
    let fine = state.services.fines.get(id).await?;
    if claims.role == Role::Reader {
        if fine.reader_id.is_none() || fine.reader_id != claims.reader_id {
            return Err(AppError::Authorization(
                "Readers can only access their own records".to_string(),
            ));
        }
    } else {
        claims.require_accountant()?;
    }
    Ok(Json(fine))
}

/// Issue a fine receipt for a violation
#[utoipa::path(
    post,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    request_body = CreateFine,
    responses(
        (status = 201, description = "Fine issued", body = Receipt),
        (status = 404, description = "Violation not found"),
        (status = 409, description = "Violation already has a pending fine"),
        (status = 422, description = "Violation already processed")
    )
)]
pub async fn create_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateFine>,
) -> AppResult<(StatusCode, Json<Receipt>)> {
    claims.require_accountant()?;

    let fine = state.services.fines.create(&data).await?;
    Ok((StatusCode::CREATED, Json(fine)))
}

/// Correct a pending fine
#[utoipa::path(
    put,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    request_body = UpdateReceipt,
    responses(
        (status = 200, description = "Fine updated", body = Receipt),
        (status = 404, description = "Fine not found"),
        (status = 422, description = "Fine is no longer pending")
    )
)]
pub async fn update_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateReceipt>,
) -> AppResult<Json<Receipt>> {
    claims.require_accountant()?;

    let fine = state.services.fines.update(id, &data).await?;
    Ok(Json(fine))
}

/// Delete a pending fine
#[utoipa::path(
    delete,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    responses(
        (status = 204, description = "Fine deleted"),
        (status = 404, description = "Fine not found"),
        (status = 422, description = "Fine already collected")
    )
)]
pub async fn delete_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_accountant()?;

    state.services.fines.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Collect payment of a fine
#[utoipa::path(
    post,
    path = "/fines/{id}/pay",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Fine paid", body = Receipt),
        (status = 404, description = "Fine not found"),
        (status = 422, description = "Fine is not pending")
    )
)]
pub async fn pay_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Receipt>> {
    claims.require_accountant()?;

    let fine = state.services.fines.pay(id, claims.user_id).await?;
    Ok(Json(fine))
}

/// Preview the fine for a violation
#[utoipa::path(
    get,
    path = "/fines/calculate",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses(
        (status = 200, description = "Fine breakdown", body = FineAssessment),
        (status = 400, description = "Invalid parameters")
    )
)]
pub async fn calculate_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<FineAssessment>> {
    claims.require_librarian_or_accountant()?;

    let assessment = state.services.fines.calculate(&query).await?;
    Ok(Json(assessment))
}

/// Fine collection statistics for a period
#[utoipa::path(
    get,
    path = "/fines/stats",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(ReceiptStatsQuery),
    responses(
        (status = 200, description = "Fine statistics", body = ReceiptStats)
    )
)]
pub async fn fine_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReceiptStatsQuery>,
) -> AppResult<Json<ReceiptStats>> {
    claims.require_accountant()?;

    let stats = state.services.fines.stats(query.from, query.to).await?;
    Ok(Json(stats))
}
