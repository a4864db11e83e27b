//! Fine rate table
//!
//! All amounts are in VND. The fine for a violation is the late component
//! (days late times the daily rate) plus the component for its kind: a share
//! of the book value for damage, the full value plus a processing fee for a
//! lost copy.

use rust_decimal::Decimal;

use crate::models::{
    violation::FineAssessment, ReturnCondition, Severity, ViolationKind,
};

pub const LATE_FEE_PER_DAY: i64 = 5_000;
pub const LOST_PROCESSING_FEE: i64 = 20_000;
/// Value assumed for books without a recorded price
pub const DEFAULT_BOOK_VALUE: i64 = 100_000;

/// Late severity bands: 1-7 days minor, 8-30 moderate, longer severe
pub fn severity_for_days_late(days_late: i32) -> Severity {
    match days_late {
        i32::MIN..=7 => Severity::Minor,
        8..=30 => Severity::Moderate,
        _ => Severity::Severe,
    }
}

/// Share of the book value charged for damage
pub fn damage_rate(severity: Severity) -> Decimal {
    match severity {
        Severity::Minor => Decimal::new(10, 2),
        Severity::Moderate => Decimal::new(30, 2),
        Severity::Severe => Decimal::new(50, 2),
    }
}

fn default_severity(kind: ViolationKind, days_late: i32) -> Severity {
    match kind {
        ViolationKind::Late => severity_for_days_late(days_late),
        ViolationKind::Damaged => Severity::Moderate,
        ViolationKind::Lost => Severity::Severe,
    }
}

/// Compute the fine for a violation
pub fn assess(
    kind: ViolationKind,
    severity: Option<Severity>,
    days_late: i32,
    book_value: Option<Decimal>,
) -> FineAssessment {
    let days_late = days_late.max(0);
    let value = book_value
        .filter(|v| *v > Decimal::ZERO)
        .unwrap_or_else(|| Decimal::from(DEFAULT_BOOK_VALUE));
    let severity = severity.unwrap_or_else(|| default_severity(kind, days_late));

    let late_fee = Decimal::from(LATE_FEE_PER_DAY) * Decimal::from(days_late);
    let damage_fee = match kind {
        ViolationKind::Late => Decimal::ZERO,
        ViolationKind::Damaged => (value * damage_rate(severity)).round_dp(0),
        ViolationKind::Lost => value + Decimal::from(LOST_PROCESSING_FEE),
    };

    FineAssessment {
        kind,
        severity,
        days_late,
        late_fee,
        damage_fee,
        total: late_fee + damage_fee,
    }
}

/// Fine for a returned copy; `None` when it came back on time and intact
pub fn assess_return(
    condition: ReturnCondition,
    severity: Option<Severity>,
    days_late: i64,
    book_value: Option<Decimal>,
) -> Option<FineAssessment> {
    let days_late = days_late.clamp(0, i32::MAX as i64) as i32;
    let kind = match condition {
        ReturnCondition::Good if days_late == 0 => return None,
        ReturnCondition::Good => ViolationKind::Late,
        ReturnCondition::Damaged => ViolationKind::Damaged,
        ReturnCondition::Lost => ViolationKind::Lost,
    };
    Some(assess(kind, severity, days_late, book_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_fee_is_flat_per_day() {
        let fine = assess(ViolationKind::Late, None, 4, None);
        assert_eq!(fine.late_fee, Decimal::from(20_000));
        assert_eq!(fine.damage_fee, Decimal::ZERO);
        assert_eq!(fine.total, Decimal::from(20_000));
        assert_eq!(fine.severity, Severity::Minor);
    }

    #[test]
    fn late_severity_bands() {
        assert_eq!(severity_for_days_late(1), Severity::Minor);
        assert_eq!(severity_for_days_late(7), Severity::Minor);
        assert_eq!(severity_for_days_late(8), Severity::Moderate);
        assert_eq!(severity_for_days_late(30), Severity::Moderate);
        assert_eq!(severity_for_days_late(31), Severity::Severe);
    }

    #[test]
    fn damage_uses_share_of_book_value() {
        let value = Some(Decimal::from(80_000));
        assert_eq!(assess(ViolationKind::Damaged, Some(Severity::Minor), 0, value).total, Decimal::from(8_000));
        assert_eq!(assess(ViolationKind::Damaged, Some(Severity::Moderate), 0, value).total, Decimal::from(24_000));
        assert_eq!(assess(ViolationKind::Damaged, Some(Severity::Severe), 0, value).total, Decimal::from(40_000));
    }

    #[test]
    fn damaged_and_late_add_up() {
        let fine = assess(ViolationKind::Damaged, Some(Severity::Severe), 2, Some(Decimal::from(60_000)));
        assert_eq!(fine.late_fee, Decimal::from(10_000));
        assert_eq!(fine.damage_fee, Decimal::from(30_000));
        assert_eq!(fine.total, Decimal::from(40_000));
    }

    #[test]
    fn lost_book_charges_value_plus_fee() {
        let fine = assess(ViolationKind::Lost, None, 0, Some(Decimal::from(150_000)));
        assert_eq!(fine.total, Decimal::from(170_000));
        assert_eq!(fine.severity, Severity::Severe);

        let unpriced = assess(ViolationKind::Lost, None, 0, None);
        assert_eq!(unpriced.total, Decimal::from(DEFAULT_BOOK_VALUE + LOST_PROCESSING_FEE));
    }

    #[test]
    fn zero_price_falls_back_to_default_value() {
        let fine = assess(ViolationKind::Damaged, Some(Severity::Minor), 0, Some(Decimal::ZERO));
        assert_eq!(fine.total, Decimal::from(10_000));
    }

    #[test]
    fn assessment_is_deterministic() {
        let a = assess(ViolationKind::Late, Some(Severity::Moderate), 12, None);
        let b = assess(ViolationKind::Late, Some(Severity::Moderate), 12, None);
        assert_eq!(a, b);
        assert_eq!(a.total, Decimal::from(60_000));
    }

    #[test]
    fn on_time_good_return_has_no_fine() {
        assert!(assess_return(ReturnCondition::Good, None, 0, None).is_none());
        let late = assess_return(ReturnCondition::Good, None, 3, None).unwrap();
        assert_eq!(late.kind, ViolationKind::Late);
        assert_eq!(late.total, Decimal::from(15_000));
        let lost = assess_return(ReturnCondition::Lost, None, 0, None).unwrap();
        assert_eq!(lost.kind, ViolationKind::Lost);
    }

    #[test]
    fn negative_days_are_ignored() {
        let fine = assess(ViolationKind::Late, None, -5, None);
        assert_eq!(fine.days_late, 0);
        assert_eq!(fine.total, Decimal::ZERO);
    }
}
