//! Report response types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{AmountEntry, StatEntry};

/// Report period; defaults to the last 30 days
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Rows in top lists (default 10, max 50)
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowingReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub tickets_created: i64,
    pub books_borrowed: i64,
    pub books_returned: i64,
    pub currently_overdue: i64,
    pub late_returns: i64,
    pub top_books: Vec<StatEntry>,
    pub top_readers: Vec<StatEntry>,
    pub by_category: Vec<StatEntry>,
}

/// Collected amounts for one month
#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    /// YYYY-MM
    pub month: String,
    #[schema(value_type = String)]
    pub membership_fees: Decimal,
    #[schema(value_type = String)]
    pub fines: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[schema(value_type = String)]
    pub collected_total: Decimal,
    pub collected_by_kind: Vec<AmountEntry>,
    #[schema(value_type = String)]
    pub pending_total: Decimal,
    pub monthly: Vec<MonthlyRevenue>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub stock_ins: i64,
    pub copies_received: i64,
    #[schema(value_type = String)]
    pub stock_in_spend: Decimal,
    pub completed_checks: i64,
    pub net_variance: i64,
    pub copies_lost: i64,
    pub low_stock: Vec<StatEntry>,
}
