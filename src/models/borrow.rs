//! Borrow ticket (loan transaction) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    enums::{BorrowStatus, ReturnCondition, Severity},
    reservation::Reservation,
    StatEntry,
};

/// Borrow ticket from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowTicket {
    pub id: i32,
    pub reader_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub renew_count: i32,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One book on a ticket, joined with its title
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowLine {
    pub id: i32,
    pub ticket_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub returned_at: Option<DateTime<Utc>>,
    pub return_condition: Option<ReturnCondition>,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
}

/// Ticket with its lines and reader name
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowDetails {
    #[serde(flatten)]
    pub ticket: BorrowTicket,
    pub reader_name: String,
    pub lines: Vec<BorrowLine>,
    pub is_overdue: bool,
}

/// Row used for ticket lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowSummary {
    pub id: i32,
    pub reader_id: i32,
    pub reader_name: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub renew_count: i32,
    pub nb_books: i64,
    pub nb_outstanding: i64,
}

/// Borrow list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowQuery {
    pub reader_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<BorrowStatus>,
    /// Borrowed on or after this date
    pub from: Option<NaiveDate>,
    /// Borrowed on or before this date
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBorrow {
    pub reader_id: i32,
    #[validate(length(min = 1, message = "At least one book is required"))]
    pub book_ids: Vec<i32>,
    /// Loan length, capped at the reader's max_borrow_days
    pub days: Option<i32>,
    pub notes: Option<String>,
}

/// Staff corrections on an open ticket
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBorrow {
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Return of one book with its condition
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnLine {
    pub book_id: i32,
    /// Defaults to good
    pub condition: Option<ReturnCondition>,
    /// Damage severity; defaults to moderate for damaged copies
    pub severity: Option<Severity>,
}

/// Return request; no lines means every outstanding book comes back in good condition
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnBorrow {
    #[serde(default)]
    pub lines: Vec<ReturnLine>,
}

/// Return outcome
#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnResult {
    pub borrow: BorrowDetails,
    pub days_late: i64,
    /// Fine receipts raised by this return
    pub fine_receipt_ids: Vec<i32>,
    #[schema(value_type = String)]
    pub total_fine: Decimal,
    /// Reservations that became ready because copies came back
    pub ready_reservations: Vec<Reservation>,
}

/// Circulation statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowStats {
    pub open_tickets: i64,
    pub overdue_tickets: i64,
    pub books_out: i64,
    pub borrowed_today: i64,
    pub returned_today: i64,
    pub by_status: Vec<StatEntry>,
}
