//! Stock-in (goods receipt) model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::AmountEntry;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StockIn {
    pub id: i32,
    pub supplier: String,
    pub received_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StockInLine {
    pub id: i32,
    pub stock_in_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockInDetails {
    #[serde(flatten)]
    pub stock_in: StockIn,
    pub lines: Vec<StockInLine>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StockInQuery {
    /// Supplier name contains
    pub supplier: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateStockInLine {
    pub book_id: i32,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStockIn {
    #[validate(length(min = 1, message = "Supplier is required"))]
    pub supplier: String,
    /// Defaults to now
    pub received_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<CreateStockInLine>,
}

/// Lines are immutable once stock has been received
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStockIn {
    #[validate(length(min = 1, message = "Supplier cannot be empty"))]
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockInStats {
    pub receipts: i64,
    pub copies_received: i64,
    #[schema(value_type = String)]
    pub total_spent: Decimal,
    pub by_supplier: Vec<AmountEntry>,
}
