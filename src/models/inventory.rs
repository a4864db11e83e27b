//! Inventory check (stock count reconciliation) and stock overview types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{enums::CheckStatus, StatEntry};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InventoryCheck {
    pub id: i32,
    pub checked_at: DateTime<Utc>,
    pub checked_by: Option<i32>,
    pub status: CheckStatus,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InventoryCheckLine {
    pub id: i32,
    pub check_id: i32,
    pub book_id: i32,
    pub book_title: String,
    /// Total quantity on record when the line was counted
    pub system_quantity: i32,
    pub actual_quantity: i32,
    /// actual - system
    pub variance: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryCheckDetails {
    #[serde(flatten)]
    pub check: InventoryCheck,
    pub lines: Vec<InventoryCheckLine>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct InventoryCheckQuery {
    pub status: Option<CheckStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CountLine {
    pub book_id: i32,
    pub actual_quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryCheck {
    pub checked_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<CountLine>,
}

/// Draft edits; given lines replace counts for the same books
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateInventoryCheck {
    pub notes: Option<String>,
    #[serde(default)]
    pub lines: Vec<CountLine>,
    /// Books whose lines are dropped from the draft
    #[serde(default)]
    pub remove_book_ids: Vec<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryCheckStats {
    pub drafts: i64,
    pub completed: i64,
    /// Sum of variances over completed checks
    pub net_variance: i64,
    pub lines_with_variance: i64,
}

/// Per-title stock position
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StockLevel {
    pub book_id: i32,
    pub title: String,
    pub category: Option<String>,
    pub shelf_location: Option<String>,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub borrowed_quantity: i32,
    /// Copies set aside for ready reservations
    pub held_quantity: i64,
    pub waiting_reservations: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StockQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    /// Low stock cut-off; defaults to the configured threshold
    pub threshold: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Manual quantity correction outside a full inventory check
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockAdjustment {
    /// Change applied to total and available quantity
    pub delta: i32,
    #[validate(length(min = 1, message = "A reason is required"))]
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryStats {
    pub titles: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub borrowed_copies: i64,
    pub low_stock_titles: i64,
    pub out_of_stock_titles: i64,
    pub copies_by_category: Vec<StatEntry>,
}
