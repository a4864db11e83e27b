//! Purchase proposal endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        proposal::{CreateProposal, ProposalQuery, ProposalStats, PurchaseProposal, ReviewProposal, UpdateProposal},
        Page,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List purchase proposals
#[utoipa::path(
    get,
    path = "/proposals",
    tag = "proposals",
    security(("bearer_auth" = [])),
    params(ProposalQuery),
    responses(
        (status = 200, description = "Proposals", body = PaginatedResponse<PurchaseProposal>)
    )
)]
pub async fn list_proposals(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ProposalQuery>,
) -> AppResult<Json<PaginatedResponse<PurchaseProposal>>> {
    claims.require_staff()?;

    let page = Page::new(query.page, query.per_page);
    let (items, total) = state.services.proposals.list(&query, page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

/// Get a purchase proposal
#[utoipa::path(
    get,
    path = "/proposals/{id}",
    tag = "proposals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Proposal ID")),
    responses(
        (status = 200, description = "Proposal", body = PurchaseProposal),
        (status = 404, description = "Proposal not found")
    )
)]
pub async fn get_proposal(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<PurchaseProposal>> {
    claims.require_staff()?;

    let proposal = state.services.proposals.get(id).await?;
    Ok(Json(proposal))
}

/// Submit a purchase proposal
#[utoipa::path(
    post,
    path = "/proposals",
    tag = "proposals",
    security(("bearer_auth" = [])),
    request_body = CreateProposal,
    responses(
        (status = 201, description = "Proposal submitted", body = PurchaseProposal),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_proposal(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateProposal>,
) -> AppResult<(StatusCode, Json<PurchaseProposal>)> {
    claims.require_staff()?;
    data.validate()?;

    let proposal = state.services.proposals.create(&data, Some(claims.user_id)).await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

/// Edit a pending proposal
#[utoipa::path(
    put,
    path = "/proposals/{id}",
    tag = "proposals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Proposal ID")),
    request_body = UpdateProposal,
    responses(
        (status = 200, description = "Proposal updated", body = PurchaseProposal),
        (status = 404, description = "Proposal not found"),
        (status = 422, description = "Proposal already reviewed")
    )
)]
pub async fn update_proposal(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateProposal>,
) -> AppResult<Json<PurchaseProposal>> {
    claims.require_staff()?;
    data.validate()?;

    let proposal = state.services.proposals.update(id, &data).await?;
    Ok(Json(proposal))
}

/// Withdraw a pending proposal
#[utoipa::path(
    delete,
    path = "/proposals/{id}",
    tag = "proposals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Proposal ID")),
    responses(
        (status = 204, description = "Proposal deleted"),
        (status = 404, description = "Proposal not found"),
        (status = 422, description = "Proposal already reviewed")
    )
)]
pub async fn delete_proposal(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.proposals.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approve a pending proposal
#[utoipa::path(
    post,
    path = "/proposals/{id}/approve",
    tag = "proposals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Proposal ID")),
    request_body = ReviewProposal,
    responses(
        (status = 200, description = "Proposal approved", body = PurchaseProposal),
        (status = 403, description = "Administrator only"),
        (status = 422, description = "Proposal already reviewed")
    )
)]
pub async fn approve_proposal(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ReviewProposal>,
) -> AppResult<Json<PurchaseProposal>> {
    claims.require_admin()?;

    let proposal = state.services.proposals.approve(id, claims.user_id, &data).await?;
    Ok(Json(proposal))
}

/// Reject a pending proposal
#[utoipa::path(
    post,
    path = "/proposals/{id}/reject",
    tag = "proposals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Proposal ID")),
    request_body = ReviewProposal,
    responses(
        (status = 200, description = "Proposal rejected", body = PurchaseProposal),
        (status = 403, description = "Administrator only"),
        (status = 422, description = "Proposal already reviewed")
    )
)]
pub async fn reject_proposal(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ReviewProposal>,
) -> AppResult<Json<PurchaseProposal>> {
    claims.require_admin()?;

    let proposal = state.services.proposals.reject(id, claims.user_id, &data).await?;
    Ok(Json(proposal))
}

/// Proposal statistics
#[utoipa::path(
    get,
    path = "/proposals/stats",
    tag = "proposals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Proposal statistics", body = ProposalStats)
    )
)]
pub async fn proposal_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ProposalStats>> {
    claims.require_staff()?;

    let stats = state.services.proposals.stats().await?;
    Ok(Json(stats))
}
