//! Borrows repository: tickets, lines, returns and renewals

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};
use std::collections::{HashMap, HashSet};

use super::{books, readers, reservations, violations, where_clause};
use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        borrow::{BorrowLine, BorrowQuery, BorrowStats, BorrowSummary, ReturnLine, UpdateBorrow},
        BorrowDetails, BorrowStatus, BorrowTicket, Page, ReturnCondition, StatEntry,
    },
    rules::{self, inventory::Stock},
};

/// New ticket request after validation
#[derive(Debug)]
pub struct NewBorrow<'a> {
    pub reader_id: i32,
    pub book_ids: &'a [i32],
    pub days: Option<i32>,
    pub notes: Option<&'a str>,
    pub created_by: Option<i32>,
}

/// What a return changed
#[derive(Debug, Default)]
pub struct ReturnOutcome {
    pub days_late: i64,
    pub fine_receipt_ids: Vec<i32>,
    pub total_fine: Decimal,
    pub promoted: Vec<i32>,
}

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List tickets with book counts, newest first
    pub async fn list(&self, query: &BorrowQuery, page: Page) -> AppResult<(Vec<BorrowSummary>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.reader_id.is_some() {
            conditions.push(format!("t.reader_id = ${}", idx));
            idx += 1;
        }
        if query.book_id.is_some() {
            conditions.push(format!(
                "EXISTS(SELECT 1 FROM borrow_lines bl WHERE bl.ticket_id = t.id AND bl.book_id = ${})",
                idx
            ));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("t.status = ${}", idx));
            idx += 1;
        }
        if query.from.is_some() {
            conditions.push(format!("t.borrow_date::date >= ${}", idx));
            idx += 1;
        }
        if query.to.is_some() {
            conditions.push(format!("t.borrow_date::date <= ${}", idx));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(v) = query.reader_id { builder = builder.bind(v); }
                if let Some(v) = query.book_id { builder = builder.bind(v); }
                if let Some(v) = query.status { builder = builder.bind(v); }
                if let Some(v) = query.from { builder = builder.bind(v); }
                if let Some(v) = query.to { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM borrow_tickets t {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            r#"
            SELECT t.id, t.reader_id, d.full_name AS reader_name, t.borrow_date, t.due_date,
                   t.return_date, t.status, t.renew_count,
                   (SELECT COUNT(*) FROM borrow_lines l WHERE l.ticket_id = t.id) AS nb_books,
                   (SELECT COUNT(*) FROM borrow_lines l
                    WHERE l.ticket_id = t.id AND l.returned_at IS NULL) AS nb_outstanding
            FROM borrow_tickets t
            JOIN readers d ON d.id = t.reader_id
            {}
            ORDER BY t.borrow_date DESC, t.id DESC
            LIMIT {} OFFSET {}
            "#,
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, BorrowSummary>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_ticket(&self, id: i32) -> AppResult<BorrowTicket> {
        sqlx::query_as::<_, BorrowTicket>("SELECT * FROM borrow_tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow ticket with id {} not found", id)))
    }

    /// Ticket with reader name and lines
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowDetails> {
        let ticket = self.get_ticket(id).await?;

        let reader_name: String = sqlx::query_scalar("SELECT full_name FROM readers WHERE id = $1")
            .bind(ticket.reader_id)
            .fetch_one(&self.pool)
            .await?;

        let lines = sqlx::query_as::<_, BorrowLine>(
            r#"
            SELECT l.id, l.ticket_id, l.book_id, b.title AS book_title, l.returned_at,
                   l.return_condition, l.fine_amount
            FROM borrow_lines l
            JOIN books b ON b.id = l.book_id
            WHERE l.ticket_id = $1
            ORDER BY l.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let is_overdue = ticket.status != BorrowStatus::Returned
            && rules::borrowing::is_overdue(ticket.due_date, Utc::now());

        Ok(BorrowDetails {
            ticket,
            reader_name,
            lines,
            is_overdue,
        })
    }

    /// Open a ticket: checks the reader, takes one copy of every book and
    /// closes the reader's own reservations for them
    pub async fn create(&self, new: &NewBorrow<'_>, now: DateTime<Utc>) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let reader = readers::lock(&mut tx, new.reader_id).await?;
        let outstanding = readers::count_outstanding(&mut tx, new.reader_id).await?;
        rules::borrowing::check_borrow_eligibility(
            &reader,
            outstanding,
            new.book_ids.len(),
            now.date_naive(),
        )?;

        let days = rules::borrowing::loan_days(new.days, reader.max_borrow_days)?;
        let due_date = rules::borrowing::due_date(now, days)?;

        let ticket_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO borrow_tickets (reader_id, borrow_date, due_date, status, renew_count, notes, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $6, $2, $2)
            RETURNING id
            "#,
        )
        .bind(new.reader_id)
        .bind(now)
        .bind(due_date)
        .bind(BorrowStatus::Borrowed)
        .bind(new.notes)
        .bind(new.created_by)
        .fetch_one(&mut *tx)
        .await?;

        // Lock books in id order so concurrent tickets cannot deadlock
        let mut book_ids = new.book_ids.to_vec();
        book_ids.sort_unstable();

        for book_id in book_ids {
            let book = books::lock(&mut tx, book_id).await?;
            let held = books::held_for_others(&mut tx, book_id, new.reader_id).await?;
            rules::borrowing::ensure_copy_free(&book.title, book.status, book.available_quantity, held)?;

            let stock = Stock::new(book.total_quantity, book.available_quantity)
                .checkout()
                .ok_or_else(|| {
                    AppError::rule(
                        ErrorCode::NoCopyAvailable,
                        format!("No copy of '{}' is available", book.title),
                    )
                })?;
            books::save_stock(&mut tx, book_id, stock, now).await?;

            sqlx::query("INSERT INTO borrow_lines (ticket_id, book_id) VALUES ($1, $2)")
                .bind(ticket_id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;

            reservations::fulfil_for_reader(&mut tx, new.reader_id, book_id, now).await?;
        }

        tx.commit().await?;
        Ok(ticket_id)
    }

    /// Correct the due date or notes of an open ticket
    pub async fn update(&self, id: i32, data: &UpdateBorrow, now: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let ticket = lock(&mut tx, id).await?;
        if ticket.status == BorrowStatus::Returned {
            return Err(AppError::rule(
                ErrorCode::AlreadyReturned,
                format!("Borrow ticket {} is already returned", id),
            ));
        }

        let due_date = data.due_date.unwrap_or(ticket.due_date);
        if due_date < ticket.borrow_date {
            return Err(AppError::Validation("Due date cannot precede the borrow date".to_string()));
        }
        let status = if rules::borrowing::is_overdue(due_date, now) {
            BorrowStatus::Overdue
        } else {
            BorrowStatus::Borrowed
        };

        sqlx::query(
            r#"
            UPDATE borrow_tickets
            SET due_date = $2, status = $3, notes = COALESCE($4, notes), updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(due_date)
        .bind(status)
        .bind(&data.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a ticket whose books are all back
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.get_ticket(id).await?;

        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_lines WHERE ticket_id = $1 AND returned_at IS NULL",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if outstanding > 0 {
            return Err(AppError::rule(
                ErrorCode::BooksOnLoan,
                format!("Borrow ticket {} still has {} books out", id, outstanding),
            ));
        }

        sqlx::query("DELETE FROM borrow_tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Return some or all outstanding books of a ticket. Late, damaged or
    /// lost copies raise a violation with a pending fine; copies back on the
    /// shelf go to waiting reservations.
    pub async fn return_books(
        &self,
        id: i32,
        lines: &[ReturnLine],
        hold_days: i64,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnOutcome> {
        let mut tx = self.pool.begin().await?;

        let ticket = lock(&mut tx, id).await?;
        if ticket.status == BorrowStatus::Returned {
            return Err(AppError::rule(
                ErrorCode::AlreadyReturned,
                format!("Borrow ticket {} is already returned", id),
            ));
        }

        let open: Vec<(i32, i32)> = sqlx::query_as(
            r#"
            SELECT id, book_id FROM borrow_lines
            WHERE ticket_id = $1 AND returned_at IS NULL
            ORDER BY book_id
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let open: HashMap<i32, i32> = open.into_iter().map(|(line_id, book_id)| (book_id, line_id)).collect();

        let selected = select_returns(&open, lines, id)?;

        let days_late = rules::borrowing::days_late(ticket.due_date, now);
        let mut outcome = ReturnOutcome {
            days_late,
            ..Default::default()
        };
        let mut restocked = Vec::new();

        for line in &selected {
            let condition = line.condition.unwrap_or(ReturnCondition::Good);
            let line_id = open[&line.book_id];

            let book = books::lock(&mut tx, line.book_id).await?;
            let stock = Stock::new(book.total_quantity, book.available_quantity).check_in(condition);
            books::save_stock(&mut tx, line.book_id, stock, now).await?;
            if condition != ReturnCondition::Lost {
                restocked.push(line.book_id);
            }

            let fine = rules::fines::assess_return(condition, line.severity, days_late, book.price);
            let fine_amount = match fine {
                Some(ref fine) => {
                    let description = format!("Returned '{}' ({})", book.title, condition);
                    let (_, receipt_id) = violations::insert_assessed(
                        &mut tx,
                        ticket.reader_id,
                        Some(id),
                        Some(line.book_id),
                        fine,
                        Some(&description),
                        now,
                    )
                    .await?;
                    outcome.fine_receipt_ids.push(receipt_id);
                    outcome.total_fine += fine.total;
                    fine.total
                }
                None => Decimal::ZERO,
            };

            sqlx::query(
                r#"
                UPDATE borrow_lines SET returned_at = $2, return_condition = $3, fine_amount = $4
                WHERE id = $1
                "#,
            )
            .bind(line_id)
            .bind(now)
            .bind(condition)
            .bind(fine_amount)
            .execute(&mut *tx)
            .await?;
        }

        if selected.len() == open.len() {
            sqlx::query(
                "UPDATE borrow_tickets SET status = $2, return_date = $3, updated_at = $3 WHERE id = $1",
            )
            .bind(id)
            .bind(BorrowStatus::Returned)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("UPDATE borrow_tickets SET updated_at = $2 WHERE id = $1")
                .bind(id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        restocked.sort_unstable();
        restocked.dedup();
        for book_id in restocked {
            outcome.promoted.extend(reservations::promote(&mut tx, book_id, hold_days, now).await?);
        }

        tx.commit().await?;
        tracing::info!(
            "Ticket {}: {} book(s) returned, {} day(s) late, fine {}",
            id,
            selected.len(),
            days_late,
            outcome.total_fine
        );
        Ok(outcome)
    }

    /// Extend the due date of an open ticket
    pub async fn renew(&self, id: i32, now: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let ticket = lock(&mut tx, id).await?;
        let reader = readers::get(&mut tx, ticket.reader_id).await?;
        rules::borrowing::check_renewal(&ticket, reader.max_renewals, now)?;

        let waiting: Option<String> = sqlx::query_scalar(
            r#"
            SELECT b.title
            FROM borrow_lines l
            JOIN books b ON b.id = l.book_id
            WHERE l.ticket_id = $1 AND l.returned_at IS NULL
              AND EXISTS(
                  SELECT 1 FROM reservations r
                  WHERE r.book_id = l.book_id AND r.reader_id != $2
                    AND r.status IN ('pending', 'ready_for_pickup')
              )
            ORDER BY b.title
            LIMIT 1
            "#,
        )
        .bind(id)
        .bind(ticket.reader_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(title) = waiting {
            return Err(AppError::rule(
                ErrorCode::ReaderWaiting,
                format!("Another reader is waiting for '{}'", title),
            ));
        }

        let due_date = rules::borrowing::renewed_due_date(ticket.due_date, reader.max_borrow_days)?;
        sqlx::query(
            r#"
            UPDATE borrow_tickets SET due_date = $2, renew_count = renew_count + 1, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(due_date)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Flag open tickets past their due date
    pub async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE borrow_tickets SET status = $1, updated_at = $2
            WHERE status = 'borrowed' AND due_date < $2
            "#,
        )
        .bind(BorrowStatus::Overdue)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn stats(&self, today: NaiveDate, now: DateTime<Utc>) -> AppResult<BorrowStats> {
        let (open_tickets, overdue_tickets, borrowed_today): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status != 'returned'),
                   COUNT(*) FILTER (WHERE status != 'returned' AND due_date < $2),
                   COUNT(*) FILTER (WHERE borrow_date::date = $1)
            FROM borrow_tickets
            "#,
        )
        .bind(today)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let (books_out, returned_today): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE returned_at IS NULL),
                   COUNT(*) FILTER (WHERE returned_at::date = $1)
            FROM borrow_lines
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        let by_status = sqlx::query_as::<_, StatEntry>(
            "SELECT status AS label, COUNT(*)::bigint AS value FROM borrow_tickets GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(BorrowStats {
            open_tickets,
            overdue_tickets,
            books_out,
            borrowed_today,
            returned_today,
            by_status,
        })
    }
}

async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<BorrowTicket> {
    sqlx::query_as::<_, BorrowTicket>("SELECT * FROM borrow_tickets WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow ticket with id {} not found", id)))
}

/// Resolve which open lines a return request covers; no lines means all of
/// them in good condition. `open` maps book id to line id.
fn select_returns(open: &HashMap<i32, i32>, lines: &[ReturnLine], ticket_id: i32) -> AppResult<Vec<ReturnLine>> {
    if lines.is_empty() {
        let mut all: Vec<ReturnLine> = open
            .keys()
            .map(|book_id| ReturnLine {
                book_id: *book_id,
                condition: None,
                severity: None,
            })
            .collect();
        all.sort_by_key(|l| l.book_id);
        return Ok(all);
    }

    let mut seen = HashSet::new();
    for line in lines {
        if !seen.insert(line.book_id) {
            return Err(AppError::Validation(format!("Book {} is listed twice", line.book_id)));
        }
        if !open.contains_key(&line.book_id) {
            return Err(AppError::rule(
                ErrorCode::AlreadyReturned,
                format!("Book {} is not outstanding on ticket {}", line.book_id, ticket_id),
            ));
        }
    }

    let mut selected = lines.to_vec();
    selected.sort_by_key(|l| l.book_id);
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_lines() -> HashMap<i32, i32> {
        HashMap::from([(10, 1), (11, 2), (12, 3)])
    }

    fn line(book_id: i32, condition: Option<ReturnCondition>) -> ReturnLine {
        ReturnLine {
            book_id,
            condition,
            severity: None,
        }
    }

    #[test]
    fn empty_request_returns_everything() {
        let selected = select_returns(&open_lines(), &[], 1).unwrap();
        let ids: Vec<i32> = selected.iter().map(|l| l.book_id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert!(selected.iter().all(|l| l.condition.is_none()));
    }

    #[test]
    fn partial_return_keeps_conditions() {
        let selected = select_returns(
            &open_lines(),
            &[line(12, Some(ReturnCondition::Lost)), line(10, None)],
            1,
        )
        .unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].book_id, 10);
        assert_eq!(selected[1].condition, Some(ReturnCondition::Lost));
    }

    #[test]
    fn unknown_or_repeated_books_are_rejected() {
        assert!(select_returns(&open_lines(), &[line(99, None)], 1).is_err());
        assert!(select_returns(&open_lines(), &[line(10, None), line(10, None)], 1).is_err());
    }
}
