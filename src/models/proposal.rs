//! Book purchase proposal model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{enums::ProposalStatus, StatEntry};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PurchaseProposal {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    pub quantity: i32,
    /// Estimated unit price
    #[schema(value_type = Option<String>)]
    pub estimated_price: Option<Decimal>,
    pub reason: Option<String>,
    pub proposed_by: Option<i32>,
    pub status: ProposalStatus,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProposalQuery {
    pub status: Option<ProposalStatus>,
    pub proposed_by: Option<i32>,
    /// Title or author contains
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProposal {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[schema(value_type = Option<String>)]
    pub estimated_price: Option<Decimal>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProposal {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub isbn: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub estimated_price: Option<Decimal>,
    pub reason: Option<String>,
}

/// Approve or reject a proposal
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewProposal {
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProposalStats {
    pub total: i64,
    pub by_status: Vec<StatEntry>,
    /// Sum of quantity x estimated price over approved proposals
    #[schema(value_type = String)]
    pub approved_budget: Decimal,
}
