//! Borrow, return and renewal rules

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{BookStatus, BorrowStatus, BorrowTicket, MembershipStatus, Reader},
};

/// Reader must hold a paid, unexpired membership
pub fn check_membership(reader: &Reader, today: NaiveDate) -> AppResult<()> {
    match reader.membership_status {
        MembershipStatus::Paid => {}
        MembershipStatus::Locked => {
            return Err(AppError::rule(
                ErrorCode::MembershipInactive,
                format!("Reader {} is locked", reader.full_name),
            ))
        }
        status => {
            return Err(AppError::rule(
                ErrorCode::MembershipInactive,
                format!("Membership of {} is {}", reader.full_name, status),
            ))
        }
    }

    if let Some(expiry) = reader.membership_expiry {
        if expiry < today {
            return Err(AppError::rule(
                ErrorCode::MembershipInactive,
                format!("Membership of {} expired on {}", reader.full_name, expiry),
            ));
        }
    }

    Ok(())
}

/// Membership check plus the per-reader book limit
pub fn check_borrow_eligibility(
    reader: &Reader,
    outstanding: i64,
    requested: usize,
    today: NaiveDate,
) -> AppResult<()> {
    check_membership(reader, today)?;

    let max = reader.max_books as i64;
    if outstanding >= max {
        return Err(AppError::rule(
            ErrorCode::BorrowLimitReached,
            format!("Borrow limit reached ({}/{})", outstanding, max),
        ));
    }
    if outstanding + requested as i64 > max {
        return Err(AppError::rule(
            ErrorCode::BorrowLimitReached,
            format!(
                "Borrowing {} more books would exceed the limit ({}/{} already out)",
                requested, outstanding, max
            ),
        ));
    }

    Ok(())
}

/// Book list of a borrow request must be non-empty and without duplicates
pub fn validate_book_ids(book_ids: &[i32]) -> AppResult<()> {
    if book_ids.is_empty() {
        return Err(AppError::Validation("At least one book is required".to_string()));
    }
    let mut seen = HashSet::new();
    for id in book_ids {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!("Book {} is listed twice", id)));
        }
    }
    Ok(())
}

/// Loan length in days: the request, capped at the reader's maximum
pub fn loan_days(requested: Option<i32>, max_borrow_days: i32) -> AppResult<i64> {
    match requested {
        Some(days) if days <= 0 => Err(AppError::Validation(
            "Loan length must be at least one day".to_string(),
        )),
        Some(days) => Ok(days.min(max_borrow_days) as i64),
        None => Ok(max_borrow_days as i64),
    }
}

pub fn due_date(borrowed_at: DateTime<Utc>, days: i64) -> AppResult<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|d| borrowed_at.checked_add_signed(d))
        .ok_or_else(|| AppError::Validation(format!("Loan of {} days is out of range", days)))
}

/// A copy is free for a reader when the shelf count exceeds holds kept for others
pub fn ensure_copy_free(
    title: &str,
    status: BookStatus,
    available: i32,
    held_for_others: i64,
) -> AppResult<()> {
    if status == BookStatus::Withdrawn {
        return Err(AppError::rule(
            ErrorCode::NotBorrowable,
            format!("'{}' is withdrawn from circulation", title),
        ));
    }
    if available as i64 - held_for_others < 1 {
        return Err(AppError::rule(
            ErrorCode::NoCopyAvailable,
            format!("No copy of '{}' is available", title),
        ));
    }
    Ok(())
}

/// Calendar days between the due date and the return, never negative
pub fn days_late(due: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
    (returned_at.date_naive() - due.date_naive()).num_days().max(0)
}

pub fn is_overdue(due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > due
}

pub fn check_renewal(ticket: &BorrowTicket, max_renewals: i32, now: DateTime<Utc>) -> AppResult<()> {
    if ticket.status == BorrowStatus::Returned {
        return Err(AppError::rule(
            ErrorCode::AlreadyReturned,
            "Cannot renew a returned ticket",
        ));
    }
    if ticket.status == BorrowStatus::Overdue || is_overdue(ticket.due_date, now) {
        return Err(AppError::rule(
            ErrorCode::Overdue,
            "Overdue tickets cannot be renewed",
        ));
    }
    if ticket.renew_count >= max_renewals {
        return Err(AppError::rule(
            ErrorCode::RenewalLimitReached,
            format!("Maximum renewals reached ({}/{})", ticket.renew_count, max_renewals),
        ));
    }
    Ok(())
}

/// Renewal extends from the current due date
pub fn renewed_due_date(current_due: DateTime<Utc>, max_borrow_days: i32) -> AppResult<DateTime<Utc>> {
    due_date(current_due, max_borrow_days as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MembershipTier;
    use chrono::TimeZone;

    pub(crate) fn reader(max_books: i32) -> Reader {
        let now = Utc::now();
        Reader {
            id: 1,
            full_name: "Nguyễn Văn An".to_string(),
            email: None,
            phone: None,
            address: None,
            birth_date: None,
            membership_tier: MembershipTier::Standard,
            membership_status: MembershipStatus::Paid,
            membership_expiry: Some(NaiveDate::from_ymd_opt(2099, 12, 31).unwrap()),
            max_books,
            max_borrow_days: 14,
            max_renewals: 1,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ticket(status: BorrowStatus, due: DateTime<Utc>, renew_count: i32) -> BorrowTicket {
        BorrowTicket {
            id: 1,
            reader_id: 1,
            borrow_date: due - Duration::days(14),
            due_date: due,
            return_date: None,
            status,
            renew_count,
            notes: None,
            created_by: None,
            created_at: due,
            updated_at: due,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn fourth_book_is_rejected_at_limit_of_three() {
        let err = check_borrow_eligibility(&reader(3), 3, 1, today()).unwrap_err();
        match err {
            AppError::BusinessRule(code, message) => {
                assert_eq!(code, ErrorCode::BorrowLimitReached);
                assert_eq!(message, "Borrow limit reached (3/3)");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn request_that_would_overflow_limit_is_rejected() {
        assert!(check_borrow_eligibility(&reader(3), 1, 2, today()).is_ok());
        assert!(check_borrow_eligibility(&reader(3), 1, 3, today()).is_err());
    }

    #[test]
    fn membership_must_be_paid_and_current() {
        let mut r = reader(3);
        r.membership_status = MembershipStatus::Pending;
        assert!(check_membership(&r, today()).is_err());

        r.membership_status = MembershipStatus::Locked;
        assert!(check_membership(&r, today()).is_err());

        r.membership_status = MembershipStatus::Paid;
        r.membership_expiry = NaiveDate::from_ymd_opt(2024, 5, 31);
        assert!(check_membership(&r, today()).is_err());

        r.membership_expiry = Some(today());
        assert!(check_membership(&r, today()).is_ok());
    }

    #[test]
    fn book_ids_must_be_distinct() {
        assert!(validate_book_ids(&[]).is_err());
        assert!(validate_book_ids(&[1, 2, 1]).is_err());
        assert!(validate_book_ids(&[1, 2, 3]).is_ok());
    }

    #[test]
    fn loan_days_are_capped() {
        assert_eq!(loan_days(None, 14).unwrap(), 14);
        assert_eq!(loan_days(Some(7), 14).unwrap(), 7);
        assert_eq!(loan_days(Some(60), 14).unwrap(), 14);
        assert!(loan_days(Some(0), 14).is_err());
    }

    #[test]
    fn copies_held_for_others_are_not_free() {
        assert!(ensure_copy_free("Dế Mèn", BookStatus::Active, 1, 0).is_ok());
        assert!(ensure_copy_free("Dế Mèn", BookStatus::Active, 1, 1).is_err());
        assert!(ensure_copy_free("Dế Mèn", BookStatus::Active, 0, 0).is_err());
        assert!(ensure_copy_free("Dế Mèn", BookStatus::Withdrawn, 4, 0).is_err());
    }

    #[test]
    fn days_late_counts_calendar_days() {
        let due = Utc.with_ymd_and_hms(2024, 6, 10, 23, 0, 0).unwrap();
        assert_eq!(days_late(due, Utc.with_ymd_and_hms(2024, 6, 9, 8, 0, 0).unwrap()), 0);
        assert_eq!(days_late(due, Utc.with_ymd_and_hms(2024, 6, 10, 23, 30, 0).unwrap()), 0);
        assert_eq!(days_late(due, Utc.with_ymd_and_hms(2024, 6, 11, 0, 30, 0).unwrap()), 1);
        assert_eq!(days_late(due, Utc.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap()), 10);
    }

    #[test]
    fn renewal_rules() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let due = now + Duration::days(3);

        assert!(check_renewal(&ticket(BorrowStatus::Borrowed, due, 0), 1, now).is_ok());
        assert!(check_renewal(&ticket(BorrowStatus::Borrowed, due, 1), 1, now).is_err());
        assert!(check_renewal(&ticket(BorrowStatus::Returned, due, 0), 1, now).is_err());
        assert!(check_renewal(&ticket(BorrowStatus::Borrowed, now - Duration::days(1), 0), 1, now).is_err());
        assert!(check_renewal(&ticket(BorrowStatus::Overdue, due, 0), 1, now).is_err());

        assert_eq!(renewed_due_date(due, 14).unwrap(), due + Duration::days(14));
    }

    #[test]
    fn due_date_out_of_range_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(due_date(now, 14).unwrap(), now + Duration::days(14));

        let err = due_date(now, i32::MAX as i64).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(renewed_due_date(now, i32::MAX).is_err());
    }
}
