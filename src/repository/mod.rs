//! Repository layer for database operations

pub mod books;
pub mod borrows;
pub mod inventory;
pub mod inventory_checks;
pub mod proposals;
pub mod readers;
pub mod receipts;
pub mod reports;
pub mod reservations;
pub mod stock_ins;
pub mod users;
pub mod violations;

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub readers: readers::ReadersRepository,
    pub users: users::UsersRepository,
    pub borrows: borrows::BorrowsRepository,
    pub reservations: reservations::ReservationsRepository,
    pub violations: violations::ViolationsRepository,
    pub receipts: receipts::ReceiptsRepository,
    pub inventory: inventory::InventoryRepository,
    pub stock_ins: stock_ins::StockInsRepository,
    pub inventory_checks: inventory_checks::InventoryChecksRepository,
    pub proposals: proposals::ProposalsRepository,
    pub reports: reports::ReportsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            readers: readers::ReadersRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            borrows: borrows::BorrowsRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            violations: violations::ViolationsRepository::new(pool.clone()),
            receipts: receipts::ReceiptsRepository::new(pool.clone()),
            inventory: inventory::InventoryRepository::new(pool.clone()),
            stock_ins: stock_ins::StockInsRepository::new(pool.clone()),
            inventory_checks: inventory_checks::InventoryChecksRepository::new(pool.clone()),
            proposals: proposals::ProposalsRepository::new(pool.clone()),
            reports: reports::ReportsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round trip to the database, used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Join filter conditions into a WHERE clause
pub(crate) fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// `%term%` pattern for case-insensitive LIKE filters
pub(crate) fn like_pattern(term: &Option<String>) -> Option<String> {
    term.as_ref()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conditions_give_no_where() {
        assert_eq!(where_clause(&[]), "");
        assert_eq!(
            where_clause(&["a = $1".to_string(), "b = $2".to_string()]),
            "WHERE a = $1 AND b = $2"
        );
    }

    #[test]
    fn like_pattern_ignores_blank_terms() {
        assert_eq!(like_pattern(&Some("  Nam Cao ".to_string())), Some("%nam cao%".to_string()));
        assert_eq!(like_pattern(&Some("   ".to_string())), None);
        assert_eq!(like_pattern(&None), None);
    }
}
