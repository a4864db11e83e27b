//! Revenue receipt model (membership fees and fines)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    enums::{ReceiptKind, ReceiptStatus},
    AmountEntry,
};

/// Receipt joined with reader name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Receipt {
    pub id: i32,
    pub reader_id: Option<i32>,
    pub reader_name: Option<String>,
    pub kind: ReceiptKind,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub status: ReceiptStatus,
    pub violation_id: Option<i32>,
    /// Months bought by a membership fee
    pub membership_months: Option<i32>,
    pub collected_by: Option<i32>,
    pub collected_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReceiptQuery {
    pub reader_id: Option<i32>,
    pub kind: Option<ReceiptKind>,
    pub status: Option<ReceiptStatus>,
    /// Created on or after this date
    pub from: Option<NaiveDate>,
    /// Created on or before this date
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Manually issued receipt
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReceipt {
    pub reader_id: Option<i32>,
    pub kind: ReceiptKind,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub violation_id: Option<i32>,
    #[validate(range(min = 1, max = 36, message = "Months must be between 1 and 36"))]
    pub membership_months: Option<i32>,
    pub notes: Option<String>,
}

/// Corrections on a pending receipt
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateReceipt {
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub notes: Option<String>,
}

/// Date range for receipt statistics
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReceiptStatsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptStats {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[schema(value_type = String)]
    pub collected_total: Decimal,
    #[schema(value_type = String)]
    pub pending_total: Decimal,
    pub collected_by_kind: Vec<AmountEntry>,
    pub collected_count: i64,
    pub pending_count: i64,
}
