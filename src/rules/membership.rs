//! Membership status and expiry

use chrono::{Months, NaiveDate};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::MembershipStatus,
};

/// New expiry after paying for `months`, counted from today or the current
/// expiry, whichever is later
pub fn extend_expiry(current: Option<NaiveDate>, today: NaiveDate, months: u32) -> NaiveDate {
    let start = current.map_or(today, |expiry| expiry.max(today));
    start
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Status while a membership fee receipt waits for collection.
/// A running membership keeps working until it expires.
pub fn status_while_fee_pending(
    status: MembershipStatus,
    expiry: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<MembershipStatus> {
    match status {
        MembershipStatus::Locked => Err(AppError::rule(
            ErrorCode::MembershipInactive,
            "Locked readers must be unlocked before renewing",
        )),
        MembershipStatus::Paid if expiry.map_or(false, |e| e >= today) => Ok(MembershipStatus::Paid),
        _ => Ok(MembershipStatus::Pending),
    }
}

/// Status after a membership fee is collected. Payment never lifts a lock.
pub fn status_after_fee_collected(status: MembershipStatus) -> AppResult<MembershipStatus> {
    match status {
        MembershipStatus::Locked => Err(AppError::rule(
            ErrorCode::MembershipInactive,
            "Reader is locked; unlock before collecting the membership fee",
        )),
        _ => Ok(MembershipStatus::Paid),
    }
}

/// Status restored when a lock is lifted
pub fn status_after_unlock(expiry: Option<NaiveDate>, today: NaiveDate) -> MembershipStatus {
    match expiry {
        Some(e) if e >= today => MembershipStatus::Paid,
        Some(_) => MembershipStatus::Expired,
        None => MembershipStatus::Unpaid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn expiry_extends_from_later_of_today_and_expiry() {
        let today = date(2024, 6, 15);
        assert_eq!(extend_expiry(None, today, 1), date(2024, 7, 15));
        assert_eq!(extend_expiry(Some(date(2024, 1, 1)), today, 3), date(2024, 9, 15));
        assert_eq!(extend_expiry(Some(date(2024, 8, 31)), today, 6), date(2025, 2, 28));
    }

    #[test]
    fn pending_fee_keeps_running_membership() {
        let today = date(2024, 6, 15);
        assert_eq!(
            status_while_fee_pending(MembershipStatus::Paid, Some(date(2024, 7, 1)), today).unwrap(),
            MembershipStatus::Paid
        );
        assert_eq!(
            status_while_fee_pending(MembershipStatus::Paid, Some(date(2024, 6, 1)), today).unwrap(),
            MembershipStatus::Pending
        );
        assert_eq!(
            status_while_fee_pending(MembershipStatus::Unpaid, None, today).unwrap(),
            MembershipStatus::Pending
        );
        assert!(status_while_fee_pending(MembershipStatus::Locked, None, today).is_err());
    }

    #[test]
    fn collecting_fee_does_not_unlock_reader() {
        let err = status_after_fee_collected(MembershipStatus::Locked).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(ErrorCode::MembershipInactive, _)));
        assert_eq!(
            status_after_fee_collected(MembershipStatus::Pending).unwrap(),
            MembershipStatus::Paid
        );
        assert_eq!(
            status_after_fee_collected(MembershipStatus::Expired).unwrap(),
            MembershipStatus::Paid
        );
    }

    #[test]
    fn unlock_restores_status_from_expiry() {
        let today = date(2024, 6, 15);
        assert_eq!(status_after_unlock(Some(date(2024, 12, 1)), today), MembershipStatus::Paid);
        assert_eq!(status_after_unlock(Some(date(2024, 1, 1)), today), MembershipStatus::Expired);
        assert_eq!(status_after_unlock(None, today), MembershipStatus::Unpaid);
    }
}
