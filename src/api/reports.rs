//! Period reports

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::report::{BorrowingReport, InventoryReport, ReportQuery, RevenueReport},
};

use super::AuthenticatedUser;

/// Circulation report for a period
#[utoipa::path(
    get,
    path = "/reports/borrowing",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportQuery),
    responses(
        (status = 200, description = "Borrowing report", body = BorrowingReport),
        (status = 400, description = "Invalid period")
    )
)]
pub async fn borrowing_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<BorrowingReport>> {
    claims.require_librarian()?;

    let report = state.services.reports.borrowing(&query).await?;
    Ok(Json(report))
}

/// Collected and outstanding money for a period
#[utoipa::path(
    get,
    path = "/reports/revenue",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportQuery),
    responses(
        (status = 200, description = "Revenue report", body = RevenueReport),
        (status = 400, description = "Invalid period")
    )
)]
pub async fn revenue_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<RevenueReport>> {
    claims.require_accountant()?;

    let report = state.services.reports.revenue(&query).await?;
    Ok(Json(report))
}

/// Stock movements for a period
#[utoipa::path(
    get,
    path = "/reports/inventory",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportQuery),
    responses(
        (status = 200, description = "Inventory report", body = InventoryReport),
        (status = 400, description = "Invalid period")
    )
)]
pub async fn inventory_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<InventoryReport>> {
    claims.require_reporting()?;

    let report = state.services.reports.inventory(&query).await?;
    Ok(Json(report))
}
