//! Business rules as pure functions
//!
//! Repositories and services call into these; nothing here touches the
//! database or the clock.

pub mod borrowing;
pub mod catalog;
pub mod fines;
pub mod inventory;
pub mod membership;
pub mod reservations;

use chrono::{Duration, NaiveDate};

use crate::error::{AppError, AppResult};

pub const DEFAULT_REPORT_DAYS: i64 = 30;

/// Resolve an optional date range, defaulting to the last 30 days
pub fn report_period(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let to = to.unwrap_or(today);
    let from = match from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(DEFAULT_REPORT_DAYS))
            .ok_or_else(|| AppError::Validation(format!("Period end {} is out of range", to)))?,
    };
    if from > to {
        return Err(AppError::Validation(format!(
            "Period start {} is after its end {}",
            from, to
        )));
    }
    Ok((from, to))
}

/// Top list length: default 10, at most 50
pub fn top_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(10).clamp(1, 50)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_defaults_to_last_thirty_days() {
        let (from, to) = report_period(None, None, date(2024, 6, 30)).unwrap();
        assert_eq!(to, date(2024, 6, 30));
        assert_eq!(from, date(2024, 5, 31));
    }

    #[test]
    fn period_near_calendar_start_is_rejected() {
        let err = report_period(None, Some(NaiveDate::MIN), date(2024, 6, 30)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn period_must_be_ordered() {
        assert!(report_period(Some(date(2024, 7, 1)), Some(date(2024, 6, 1)), date(2024, 7, 1)).is_err());
    }

    #[test]
    fn top_limit_is_clamped() {
        assert_eq!(top_limit(None), 10);
        assert_eq!(top_limit(Some(500)), 50);
        assert_eq!(top_limit(Some(0)), 1);
    }
}
