//! Data models for the library

pub mod book;
pub mod borrow;
pub mod enums;
pub mod inventory;
pub mod proposal;
pub mod reader;
pub mod receipt;
pub mod report;
pub mod reservation;
pub mod stock_in;
pub mod user;
pub mod violation;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

// Re-export commonly used types
pub use book::Book;
pub use borrow::{BorrowDetails, BorrowTicket};
pub use enums::*;
pub use reader::Reader;
pub use receipt::Receipt;
pub use reservation::Reservation;
pub use user::{User, UserClaims};
pub use violation::Violation;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Labelled count used by statistics endpoints
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StatEntry {
    pub label: String,
    pub value: i64,
}

/// Labelled money amount used by statistics endpoints
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AmountEntry {
    pub label: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

/// Normalized pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    /// Page numbers start at 1; page sizes are capped
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults() {
        let page = Page::new(None, None);
        assert_eq!(page, Page { page: 1, per_page: 20 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn page_is_clamped() {
        let page = Page::new(Some(0), Some(10_000));
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, MAX_PER_PAGE);

        let page = Page::new(Some(3), Some(25));
        assert_eq!(page.offset(), 50);

        let page = Page::new(Some(i64::MAX), Some(100));
        assert_eq!(page.offset(), i64::MAX);
    }
}
