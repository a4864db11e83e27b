//! ISBN normalization

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{9}[\dX]|\d{13})$").expect("valid ISBN regex"));

/// Strip separators, upper-case the check digit and verify the checksum.
/// Blank input means "no ISBN".
pub fn normalize_isbn(raw: &str) -> AppResult<Option<String>> {
    let isbn: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if isbn.is_empty() {
        return Ok(None);
    }
    if !ISBN_RE.is_match(&isbn) || !checksum_ok(&isbn) {
        return Err(AppError::Validation(format!("Invalid ISBN: {}", raw.trim())));
    }
    Ok(Some(isbn))
}

fn checksum_ok(isbn: &str) -> bool {
    let digits: Vec<u32> = isbn
        .chars()
        .map(|c| if c == 'X' { 10 } else { c.to_digit(10).unwrap_or(0) })
        .collect();

    match digits.len() {
        10 => {
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, d)| (10 - i as u32) * d)
                .sum();
            sum % 11 == 0
        }
        13 => {
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
                .sum();
            sum % 10 == 0
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isbn13_with_separators() {
        assert_eq!(
            normalize_isbn("978-604-1-08529-9").unwrap(),
            Some("9786041085299".to_string())
        );
    }

    #[test]
    fn isbn10_with_check_letter() {
        assert_eq!(
            normalize_isbn("0-8044-2957-x").unwrap(),
            Some("080442957X".to_string())
        );
    }

    #[test]
    fn blank_means_none() {
        assert_eq!(normalize_isbn("  ").unwrap(), None);
    }

    #[test]
    fn bad_isbns_are_rejected() {
        assert!(normalize_isbn("12345").is_err());
        assert!(normalize_isbn("978-604-1-08529-1").is_err());
        assert!(normalize_isbn("97860410852X1").is_err());
    }
}
