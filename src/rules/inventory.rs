//! Copy count bookkeeping
//!
//! Every change to a book's quantities goes through these functions so that
//! `0 <= available <= total` holds after each step.

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{inventory::CountLine, stock_in::CreateStockInLine, ReturnCondition},
};

/// Total and available copies of one title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stock {
    pub total: i32,
    pub available: i32,
}

impl Stock {
    pub fn new(total: i32, available: i32) -> Self {
        Self { total, available }
    }

    pub fn borrowed(&self) -> i32 {
        self.total - self.available
    }

    /// One copy leaves the shelf
    pub fn checkout(self) -> Option<Stock> {
        (self.available > 0).then(|| Stock {
            available: self.available - 1,
            ..self
        })
    }

    /// One copy comes back; a lost copy is written off instead
    pub fn check_in(self, condition: ReturnCondition) -> Stock {
        match condition {
            ReturnCondition::Good | ReturnCondition::Damaged => Stock {
                available: (self.available + 1).min(self.total),
                ..self
            },
            ReturnCondition::Lost => {
                let total = (self.total - 1).max(0);
                Stock {
                    total,
                    available: self.available.min(total),
                }
            }
        }
    }

    /// Shift both counts by `delta` copies
    pub fn adjust(self, delta: i32) -> AppResult<Stock> {
        let total = self.total + delta;
        let available = self.available + delta;
        if total < 0 || available < 0 {
            return Err(AppError::rule(
                ErrorCode::InsufficientStock,
                format!(
                    "Cannot remove {} copies: only {} on the shelf",
                    -delta, self.available
                ),
            ));
        }
        Ok(Stock { total, available })
    }

    /// Set a new total, moving the shelf count by the same amount
    pub fn retotal(self, total: i32) -> AppResult<Stock> {
        self.adjust(total - self.total)
    }

    /// Apply a physical count
    pub fn recount(self, actual: i32) -> Stock {
        let delta = variance(self.total, actual);
        Stock {
            total: actual,
            available: (self.available + delta).clamp(0, actual),
        }
    }
}

pub fn variance(system: i32, actual: i32) -> i32 {
    actual - system
}

/// Initial counts of a new title
pub fn initial_stock(total: i32, available: Option<i32>) -> AppResult<Stock> {
    let available = available.unwrap_or(total);
    if total < 0 || available < 0 {
        return Err(AppError::Validation("Quantities cannot be negative".to_string()));
    }
    if available > total {
        return Err(AppError::Validation(format!(
            "Available quantity ({}) cannot exceed total quantity ({})",
            available, total
        )));
    }
    Ok(Stock { total, available })
}

/// Checks stock-in lines and returns the receipt total
pub fn stock_in_total(lines: &[CreateStockInLine]) -> AppResult<Decimal> {
    if lines.is_empty() {
        return Err(AppError::Validation("At least one line is required".to_string()));
    }
    let mut seen = HashSet::new();
    let mut total = Decimal::ZERO;
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Quantity for book {} must be positive",
                line.book_id
            )));
        }
        if line.unit_price < Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Unit price for book {} cannot be negative",
                line.book_id
            )));
        }
        if !seen.insert(line.book_id) {
            return Err(AppError::Validation(format!(
                "Book {} is listed twice",
                line.book_id
            )));
        }
        total += line.unit_price * Decimal::from(line.quantity);
    }
    Ok(total)
}

pub fn validate_count_lines(lines: &[CountLine]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for line in lines {
        if line.actual_quantity < 0 {
            return Err(AppError::Validation(format!(
                "Counted quantity for book {} cannot be negative",
                line.book_id
            )));
        }
        if !seen.insert(line.book_id) {
            return Err(AppError::Validation(format!(
                "Book {} is counted twice",
                line.book_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(book_id: i32, quantity: i32, price: i64) -> CreateStockInLine {
        CreateStockInLine {
            book_id,
            quantity,
            unit_price: Decimal::from(price),
        }
    }

    fn assert_bounds(stock: Stock) {
        assert!(stock.available >= 0);
        assert!(stock.available <= stock.total);
    }

    #[test]
    fn borrow_and_return_keep_bounds() {
        let mut stock = Stock::new(2, 2);
        let conditions = [
            ReturnCondition::Good,
            ReturnCondition::Damaged,
            ReturnCondition::Lost,
        ];

        for condition in conditions.iter().cycle().take(12) {
            if let Some(next) = stock.checkout() {
                stock = next;
            }
            assert_bounds(stock);
            stock = stock.check_in(*condition);
            assert_bounds(stock);
        }
        assert_eq!(stock.total, 0);
    }

    #[test]
    fn checkout_needs_a_copy() {
        assert_eq!(Stock::new(3, 1).checkout(), Some(Stock::new(3, 0)));
        assert_eq!(Stock::new(3, 0).checkout(), None);
    }

    #[test]
    fn return_adds_one_copy_per_non_lost_line() {
        let stock = Stock::new(5, 0);
        let stock = stock.check_in(ReturnCondition::Good);
        let stock = stock.check_in(ReturnCondition::Damaged);
        let stock = stock.check_in(ReturnCondition::Lost);
        assert_eq!(stock, Stock::new(4, 2));
    }

    #[test]
    fn return_never_exceeds_total() {
        assert_eq!(Stock::new(2, 2).check_in(ReturnCondition::Good), Stock::new(2, 2));
    }

    #[test]
    fn adjustment_cannot_remove_borrowed_copies() {
        let stock = Stock::new(5, 2);
        assert_eq!(stock.adjust(3).unwrap(), Stock::new(8, 5));
        assert_eq!(stock.adjust(-2).unwrap(), Stock::new(3, 0));
        assert!(stock.adjust(-3).is_err());
        assert_eq!(stock.retotal(6).unwrap(), Stock::new(6, 3));
    }

    #[test]
    fn recount_applies_variance() {
        assert_eq!(Stock::new(10, 6).recount(8), Stock::new(8, 4));
        assert_eq!(Stock::new(10, 1).recount(7), Stock::new(7, 0));
        assert_eq!(Stock::new(10, 10).recount(12), Stock::new(12, 12));
        assert_eq!(variance(10, 8), -2);
    }

    #[test]
    fn initial_stock_defaults_available() {
        assert_eq!(initial_stock(4, None).unwrap(), Stock::new(4, 4));
        assert!(initial_stock(4, Some(5)).is_err());
        assert!(initial_stock(-1, None).is_err());
    }

    #[test]
    fn stock_in_total_sums_lines() {
        let total = stock_in_total(&[line(1, 3, 50_000), line(2, 2, 75_000)]).unwrap();
        assert_eq!(total, Decimal::from(300_000));

        assert!(stock_in_total(&[]).is_err());
        assert!(stock_in_total(&[line(1, 0, 10)]).is_err());
        assert!(stock_in_total(&[line(1, 1, -1)]).is_err());
        assert!(stock_in_total(&[line(1, 1, 10), line(1, 2, 10)]).is_err());
    }

    #[test]
    fn count_lines_are_checked() {
        let ok = vec![
            CountLine { book_id: 1, actual_quantity: 0, note: None },
            CountLine { book_id: 2, actual_quantity: 4, note: None },
        ];
        assert!(validate_count_lines(&ok).is_ok());

        let negative = vec![CountLine { book_id: 1, actual_quantity: -1, note: None }];
        assert!(validate_count_lines(&negative).is_err());
    }
}
