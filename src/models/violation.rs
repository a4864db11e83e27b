//! Violation report and fine types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    enums::{ReceiptStatus, Severity, ViolationKind, ViolationStatus},
    AmountEntry, StatEntry,
};

/// Violation report joined with reader name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Violation {
    pub id: i32,
    pub reader_id: i32,
    pub reader_name: String,
    pub ticket_id: Option<i32>,
    pub book_id: Option<i32>,
    pub kind: ViolationKind,
    pub severity: Severity,
    pub days_late: i32,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
    pub status: ViolationStatus,
    pub description: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ViolationQuery {
    pub reader_id: Option<i32>,
    pub kind: Option<ViolationKind>,
    pub status: Option<ViolationStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Manually reported violation; the fine comes from the rate table
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateViolation {
    pub reader_id: i32,
    pub ticket_id: Option<i32>,
    /// Book whose value is used for damage and loss
    pub book_id: Option<i32>,
    pub kind: ViolationKind,
    /// Derived from days_late for late returns when omitted
    pub severity: Option<Severity>,
    #[validate(range(min = 0, message = "days_late cannot be negative"))]
    #[serde(default)]
    pub days_late: i32,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateViolation {
    pub description: Option<String>,
}

/// Fine preview parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct FineQuery {
    pub kind: ViolationKind,
    pub severity: Option<Severity>,
    pub days_late: Option<i32>,
    /// Book whose price is used as its value
    pub book_id: Option<i32>,
    #[param(value_type = Option<String>)]
    pub book_value: Option<Decimal>,
}

/// Breakdown of a computed fine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FineAssessment {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub days_late: i32,
    #[schema(value_type = String)]
    pub late_fee: Decimal,
    #[schema(value_type = String)]
    pub damage_fee: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
}

/// Fine list filters; fines are receipts of kind fine
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct FineListQuery {
    pub reader_id: Option<i32>,
    pub status: Option<ReceiptStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Issue a fine receipt for an existing violation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFine {
    pub violation_id: i32,
    /// Defaults to the violation's fine amount
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub notes: Option<String>,
}

/// Outstanding fines of one reader
#[derive(Debug, Serialize, ToSchema)]
pub struct ReaderFines {
    pub reader_id: i32,
    #[schema(value_type = String)]
    pub outstanding: Decimal,
    #[schema(value_type = String)]
    pub paid: Decimal,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ViolationStats {
    pub total: i64,
    pub pending: i64,
    pub by_kind: Vec<StatEntry>,
    pub by_severity: Vec<StatEntry>,
    pub fines_by_kind: Vec<AmountEntry>,
}
