//! Reader (library member) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    enums::{MembershipStatus, MembershipTier},
    StatEntry,
};

/// Reader from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reader {
    pub id: i32,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub membership_tier: MembershipTier,
    pub membership_status: MembershipStatus,
    pub membership_expiry: Option<NaiveDate>,
    /// Maximum books out at the same time
    pub max_books: i32,
    /// Maximum loan length in days
    pub max_borrow_days: i32,
    /// Maximum renewals per borrow ticket
    pub max_renewals: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrow limits attached to a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowLimits {
    pub max_books: i32,
    pub max_borrow_days: i32,
    pub max_renewals: i32,
}

impl MembershipTier {
    /// Limits given to new readers of this tier unless overridden
    pub fn default_limits(&self) -> BorrowLimits {
        match self {
            MembershipTier::Standard => BorrowLimits {
                max_books: 3,
                max_borrow_days: 14,
                max_renewals: 1,
            },
            MembershipTier::Student => BorrowLimits {
                max_books: 5,
                max_borrow_days: 21,
                max_renewals: 2,
            },
            MembershipTier::Vip => BorrowLimits {
                max_books: 10,
                max_borrow_days: 30,
                max_renewals: 3,
            },
        }
    }

    /// Membership fee per month, in VND
    pub fn monthly_fee(&self) -> Decimal {
        match self {
            MembershipTier::Standard => Decimal::from(20_000),
            MembershipTier::Student => Decimal::from(10_000),
            MembershipTier::Vip => Decimal::from(50_000),
        }
    }
}

impl Reader {
    pub fn limits(&self) -> BorrowLimits {
        BorrowLimits {
            max_books: self.max_books,
            max_borrow_days: self.max_borrow_days,
            max_renewals: self.max_renewals,
        }
    }
}

/// Reader search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReaderQuery {
    /// Matches name, email or phone
    pub search: Option<String>,
    pub membership_status: Option<MembershipStatus>,
    pub membership_tier: Option<MembershipTier>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create reader request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReader {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Defaults to standard
    pub membership_tier: Option<MembershipTier>,
    #[validate(range(min = 1, max = 100, message = "max_books must be between 1 and 100"))]
    pub max_books: Option<i32>,
    #[validate(range(min = 1, max = 365, message = "max_borrow_days must be between 1 and 365"))]
    pub max_borrow_days: Option<i32>,
    #[validate(range(min = 0, max = 20, message = "max_renewals must be between 0 and 20"))]
    pub max_renewals: Option<i32>,
    pub notes: Option<String>,
}

/// Update reader request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReader {
    #[validate(length(min = 1, message = "Full name cannot be empty"))]
    pub full_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub membership_tier: Option<MembershipTier>,
    #[validate(range(min = 1, max = 100, message = "max_books must be between 1 and 100"))]
    pub max_books: Option<i32>,
    #[validate(range(min = 1, max = 365, message = "max_borrow_days must be between 1 and 365"))]
    pub max_borrow_days: Option<i32>,
    #[validate(range(min = 0, max = 20, message = "max_renewals must be between 0 and 20"))]
    pub max_renewals: Option<i32>,
    pub notes: Option<String>,
}

/// Issue a membership fee receipt
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MembershipRequest {
    /// Switch tier at the same time (limits are reset to the tier defaults)
    pub membership_tier: Option<MembershipTier>,
    #[validate(range(min = 1, max = 36, message = "Months must be between 1 and 36"))]
    pub months: i32,
}

/// Reader statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct ReaderStats {
    pub total: i64,
    pub by_status: Vec<StatEntry>,
    pub by_tier: Vec<StatEntry>,
    /// Readers with at least one book out
    pub active_borrowers: i64,
    /// Paid memberships expiring within 30 days
    pub expiring_soon: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_limits_grow_with_tier() {
        let standard = MembershipTier::Standard.default_limits();
        let vip = MembershipTier::Vip.default_limits();
        assert_eq!(standard.max_books, 3);
        assert!(vip.max_books > standard.max_books);
        assert!(vip.max_borrow_days > standard.max_borrow_days);
    }

    #[test]
    fn student_fee_is_lowest() {
        let student = MembershipTier::Student.monthly_fee();
        assert!(MembershipTier::ALL.iter().all(|t| t.monthly_fee() >= student));
    }

    #[test]
    fn reader_limits_are_bounded() {
        let update = UpdateReader {
            max_borrow_days: Some(i32::MAX),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UpdateReader {
            max_books: Some(1_000),
            max_renewals: Some(-1),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UpdateReader {
            max_books: Some(5),
            max_borrow_days: Some(365),
            max_renewals: Some(0),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }
}
