//! Period reports over circulation, revenue and stock

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        report::{BorrowingReport, InventoryReport, MonthlyRevenue, RevenueReport},
        AmountEntry, StatEntry,
    },
};

#[derive(FromRow)]
struct MonthRow {
    month: String,
    membership_fees: Decimal,
    fines: Decimal,
}

#[derive(Clone)]
pub struct ReportsRepository {
    pool: Pool<Postgres>,
}

impl ReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn borrowing(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: i64,
        now: DateTime<Utc>,
    ) -> AppResult<BorrowingReport> {
        let (tickets_created, books_borrowed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT t.id), COUNT(l.id)
            FROM borrow_tickets t
            LEFT JOIN borrow_lines l ON l.ticket_id = t.id
            WHERE t.borrow_date::date BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let books_returned: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_lines WHERE returned_at::date BETWEEN $1 AND $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let currently_overdue: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_tickets WHERE status != 'returned' AND due_date < $1",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let late_returns: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM violations WHERE kind = 'late' AND created_at::date BETWEEN $1 AND $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let top_books = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT b.title AS label, COUNT(*)::bigint AS value
            FROM borrow_lines l
            JOIN borrow_tickets t ON t.id = l.ticket_id
            JOIN books b ON b.id = l.book_id
            WHERE t.borrow_date::date BETWEEN $1 AND $2
            GROUP BY b.id, b.title
            ORDER BY value DESC, b.title
            LIMIT $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let top_readers = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT d.full_name AS label, COUNT(*)::bigint AS value
            FROM borrow_lines l
            JOIN borrow_tickets t ON t.id = l.ticket_id
            JOIN readers d ON d.id = t.reader_id
            WHERE t.borrow_date::date BETWEEN $1 AND $2
            GROUP BY d.id, d.full_name
            ORDER BY value DESC, d.full_name
            LIMIT $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let by_category = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT COALESCE(b.category, 'Uncategorized') AS label, COUNT(*)::bigint AS value
            FROM borrow_lines l
            JOIN borrow_tickets t ON t.id = l.ticket_id
            JOIN books b ON b.id = l.book_id
            WHERE t.borrow_date::date BETWEEN $1 AND $2
            GROUP BY 1
            ORDER BY value DESC, label
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(BorrowingReport {
            from,
            to,
            tickets_created,
            books_borrowed,
            books_returned,
            currently_overdue,
            late_returns,
            top_books,
            top_readers,
            by_category,
        })
    }

    /// Collected amounts are dated by collection, pending ones by issue
    pub async fn revenue(&self, from: NaiveDate, to: NaiveDate) -> AppResult<RevenueReport> {
        let collected_by_kind = sqlx::query_as::<_, AmountEntry>(
            r#"
            SELECT kind AS label, COALESCE(SUM(amount), 0) AS amount
            FROM receipts
            WHERE status = 'collected' AND collected_at::date BETWEEN $1 AND $2
            GROUP BY kind
            ORDER BY kind
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        let collected_total = collected_by_kind.iter().map(|e| e.amount).sum();

        let pending_total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM receipts
            WHERE status = 'pending' AND created_at::date BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let monthly = sqlx::query_as::<_, MonthRow>(
            r#"
            SELECT to_char(date_trunc('month', collected_at), 'YYYY-MM') AS month,
                   COALESCE(SUM(amount) FILTER (WHERE kind = 'membership_fee'), 0) AS membership_fees,
                   COALESCE(SUM(amount) FILTER (WHERE kind = 'fine'), 0) AS fines
            FROM receipts
            WHERE status = 'collected' AND collected_at::date BETWEEN $1 AND $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| MonthlyRevenue {
            month: row.month,
            membership_fees: row.membership_fees,
            fines: row.fines,
        })
        .collect();

        Ok(RevenueReport {
            from,
            to,
            collected_total,
            collected_by_kind,
            pending_total,
            monthly,
        })
    }

    pub async fn inventory(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        low_stock_threshold: i32,
        limit: i64,
    ) -> AppResult<InventoryReport> {
        let (stock_ins, copies_received, stock_in_spend): (i64, i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE((SELECT SUM(l.quantity) FROM stock_in_lines l
                             JOIN stock_ins s2 ON s2.id = l.stock_in_id
                             WHERE s2.received_at::date BETWEEN $1 AND $2), 0)::bigint,
                   COALESCE(SUM(total_amount), 0)
            FROM stock_ins
            WHERE received_at::date BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let (completed_checks, net_variance): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT c.id), COALESCE(SUM(l.variance), 0)::bigint
            FROM inventory_checks c
            LEFT JOIN inventory_check_lines l ON l.check_id = c.id
            WHERE c.status = 'completed' AND c.completed_at::date BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let copies_lost: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrow_lines
            WHERE return_condition = 'lost' AND returned_at::date BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let low_stock = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT title AS label, available_quantity::bigint AS value
            FROM books
            WHERE status = 'active' AND available_quantity <= $1
            ORDER BY available_quantity, title
            LIMIT $2
            "#,
        )
        .bind(low_stock_threshold)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(InventoryReport {
            from,
            to,
            stock_ins,
            copies_received,
            stock_in_spend,
            completed_checks,
            net_variance,
            copies_lost,
            low_stock,
        })
    }
}
