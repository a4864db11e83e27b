//! Hold queue arithmetic

use chrono::{DateTime, Duration, Utc};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{BookStatus, ReservationStatus},
};

/// Pending reservations that can move to ready given the shelf count
pub fn promotable(available: i32, ready_holds: i64) -> i64 {
    (available as i64 - ready_holds).max(0)
}

pub fn hold_expiry(now: DateTime<Utc>, hold_days: i64) -> DateTime<Utc> {
    now + Duration::days(hold_days)
}

/// Reservations are only for titles with no free copy: shelf copies held
/// for other readers do not count as free
pub fn check_reservable(
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
    let free = available as i64 - held_for_others;
    if free > 0 {
        return Err(AppError::rule(
            ErrorCode::CopiesAvailable,
            format!(
                "Cannot reserve '{}': {} copies are available, borrow it directly",
                title, free
            ),
        ));
    }
    Ok(())
}

pub fn check_cancellable(status: ReservationStatus) -> AppResult<()> {
    if !status.is_active() {
        return Err(AppError::rule(
            ErrorCode::AlreadyProcessed,
            format!("Reservation is already {}", status),
        ));
    }
    Ok(())
}

pub fn check_fulfillable(
    status: ReservationStatus,
    hold_expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    match status {
        ReservationStatus::ReadyForPickup => {}
        ReservationStatus::Pending => {
            return Err(AppError::rule(
                ErrorCode::NoCopyAvailable,
                "Reservation is still waiting for a copy",
            ))
        }
        other => {
            return Err(AppError::rule(
                ErrorCode::AlreadyProcessed,
                format!("Reservation is already {}", other),
            ))
        }
    }
    if let Some(expires) = hold_expires_at {
        if expires < now {
            return Err(AppError::rule(
                ErrorCode::AlreadyProcessed,
                "Hold has expired",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_never_goes_negative() {
        assert_eq!(promotable(0, 0), 0);
        assert_eq!(promotable(2, 0), 2);
        assert_eq!(promotable(2, 1), 1);
        assert_eq!(promotable(1, 3), 0);
    }

    #[test]
    fn hold_lasts_configured_days() {
        let now = Utc::now();
        assert_eq!(hold_expiry(now, 3) - now, Duration::days(3));
    }

    #[test]
    fn only_unavailable_titles_can_be_reserved() {
        assert!(check_reservable("Tắt đèn", BookStatus::Active, 0, 0).is_ok());
        let err = check_reservable("Tắt đèn", BookStatus::Active, 2, 0).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(ErrorCode::CopiesAvailable, _)));
        assert!(check_reservable("Tắt đèn", BookStatus::Withdrawn, 0, 0).is_err());
    }

    #[test]
    fn copy_held_for_another_reader_can_be_reserved() {
        assert!(check_reservable("Tắt đèn", BookStatus::Active, 1, 1).is_ok());
        assert!(crate::rules::borrowing::ensure_copy_free("Tắt đèn", BookStatus::Active, 1, 1).is_err());

        let err = check_reservable("Tắt đèn", BookStatus::Active, 2, 1).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(ErrorCode::CopiesAvailable, _)));
    }

    #[test]
    fn cancel_and_fulfil_states() {
        assert!(check_cancellable(ReservationStatus::Pending).is_ok());
        assert!(check_cancellable(ReservationStatus::ReadyForPickup).is_ok());
        assert!(check_cancellable(ReservationStatus::Fulfilled).is_err());

        let now = Utc::now();
        let later = Some(now + Duration::days(1));
        assert!(check_fulfillable(ReservationStatus::ReadyForPickup, later, now).is_ok());
        assert!(check_fulfillable(ReservationStatus::Pending, None, now).is_err());
        assert!(check_fulfillable(ReservationStatus::Cancelled, None, now).is_err());
        assert!(check_fulfillable(
            ReservationStatus::ReadyForPickup,
            Some(now - Duration::hours(1)),
            now
        )
        .is_err());
    }
}
