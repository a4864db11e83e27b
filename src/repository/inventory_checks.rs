//! Inventory checks repository
//!
//! A check is edited as a draft and applied to book quantities only when it
//! is completed.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use super::{books, reservations, where_clause};
use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        inventory::{
            CountLine, CreateInventoryCheck, InventoryCheck, InventoryCheckDetails,
            InventoryCheckLine, InventoryCheckQuery, InventoryCheckStats, UpdateInventoryCheck,
        },
        CheckStatus, Page,
    },
    rules::inventory::{variance, Stock},
};

#[derive(Clone)]
pub struct InventoryChecksRepository {
    pool: Pool<Postgres>,
}

impl InventoryChecksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        query: &InventoryCheckQuery,
        page: Page,
    ) -> AppResult<(Vec<InventoryCheck>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if query.from.is_some() {
            conditions.push(format!("checked_at::date >= ${}", idx));
            idx += 1;
        }
        if query.to.is_some() {
            conditions.push(format!("checked_at::date <= ${}", idx));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(v) = query.status { builder = builder.bind(v); }
                if let Some(v) = query.from { builder = builder.bind(v); }
                if let Some(v) = query.to { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM inventory_checks {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "SELECT * FROM inventory_checks {} ORDER BY checked_at DESC, id DESC LIMIT {} OFFSET {}",
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, InventoryCheck>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_details(&self, id: i32) -> AppResult<InventoryCheckDetails> {
        let mut conn = self.pool.acquire().await?;
        get_details(&mut conn, id).await
    }

    /// Open a draft check with its first counts
    pub async fn create(
        &self,
        data: &CreateInventoryCheck,
        checked_by: Option<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<InventoryCheckDetails> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO inventory_checks (checked_at, checked_by, status, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(data.checked_at.unwrap_or(now))
        .bind(checked_by)
        .bind(CheckStatus::Draft)
        .bind(&data.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        upsert_lines(&mut tx, id, &data.lines).await?;

        let details = get_details(&mut tx, id).await?;
        tx.commit().await?;
        Ok(details)
    }

    /// Edit a draft: replace counts, drop lines, change notes
    pub async fn update(
        &self,
        id: i32,
        data: &UpdateInventoryCheck,
        now: DateTime<Utc>,
    ) -> AppResult<InventoryCheckDetails> {
        let mut tx = self.pool.begin().await?;
        lock_draft(&mut tx, id).await?;

        if !data.remove_book_ids.is_empty() {
            sqlx::query("DELETE FROM inventory_check_lines WHERE check_id = $1 AND book_id = ANY($2)")
                .bind(id)
                .bind(&data.remove_book_ids)
                .execute(&mut *tx)
                .await?;
        }
        upsert_lines(&mut tx, id, &data.lines).await?;

        sqlx::query("UPDATE inventory_checks SET notes = COALESCE($2, notes), updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(&data.notes)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let details = get_details(&mut tx, id).await?;
        tx.commit().await?;
        Ok(details)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_draft(&mut tx, id).await?;

        sqlx::query("DELETE FROM inventory_checks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Apply the counts to book quantities and close the check
    pub async fn complete(
        &self,
        id: i32,
        hold_days: i64,
        now: DateTime<Utc>,
    ) -> AppResult<(InventoryCheckDetails, Vec<i32>)> {
        let mut tx = self.pool.begin().await?;
        lock_draft(&mut tx, id).await?;

        let lines: Vec<(i32, i32, i32)> = sqlx::query_as(
            "SELECT id, book_id, actual_quantity FROM inventory_check_lines WHERE check_id = $1 ORDER BY book_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let mut promoted = Vec::new();
        for (line_id, book_id, actual) in lines {
            let book = books::lock(&mut tx, book_id).await?;
            let before = Stock::new(book.total_quantity, book.available_quantity);
            let after = before.recount(actual);
            books::save_stock(&mut tx, book_id, after, now).await?;

            sqlx::query("UPDATE inventory_check_lines SET system_quantity = $2, variance = $3 WHERE id = $1")
                .bind(line_id)
                .bind(before.total)
                .bind(variance(before.total, actual))
                .execute(&mut *tx)
                .await?;

            if after.available > before.available {
                promoted.extend(reservations::promote(&mut tx, book_id, hold_days, now).await?);
            }
        }

        sqlx::query(
            "UPDATE inventory_checks SET status = $2, completed_at = $3, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(CheckStatus::Completed)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let details = get_details(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!("Inventory check {} completed with {} line(s)", id, details.lines.len());
        Ok((details, promoted))
    }

    pub async fn stats(&self) -> AppResult<InventoryCheckStats> {
        let (drafts, completed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'draft'),
                   COUNT(*) FILTER (WHERE status = 'completed')
            FROM inventory_checks
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (net_variance, lines_with_variance): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(l.variance), 0)::bigint, COUNT(*) FILTER (WHERE l.variance != 0)
            FROM inventory_check_lines l
            JOIN inventory_checks c ON c.id = l.check_id
            WHERE c.status = 'completed'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(InventoryCheckStats {
            drafts,
            completed,
            net_variance,
            lines_with_variance,
        })
    }
}

async fn get_details(conn: &mut PgConnection, id: i32) -> AppResult<InventoryCheckDetails> {
    let check = sqlx::query_as::<_, InventoryCheck>("SELECT * FROM inventory_checks WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inventory check with id {} not found", id)))?;

    let lines = sqlx::query_as::<_, InventoryCheckLine>(
        r#"
        SELECT l.id, l.check_id, l.book_id, b.title AS book_title, l.system_quantity,
               l.actual_quantity, l.variance, l.note
        FROM inventory_check_lines l
        JOIN books b ON b.id = l.book_id
        WHERE l.check_id = $1
        ORDER BY b.title, l.id
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(InventoryCheckDetails { check, lines })
}

async fn lock_draft(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let status: CheckStatus =
        sqlx::query_scalar("SELECT status FROM inventory_checks WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inventory check with id {} not found", id)))?;
    if status != CheckStatus::Draft {
        return Err(AppError::rule(
            ErrorCode::AlreadyProcessed,
            format!("Inventory check {} is already completed", id),
        ));
    }
    Ok(())
}

/// Insert or replace counts; the system quantity is the current total
async fn upsert_lines(conn: &mut PgConnection, check_id: i32, lines: &[CountLine]) -> AppResult<()> {
    for line in lines {
        let system: i32 = sqlx::query_scalar("SELECT total_quantity FROM books WHERE id = $1")
            .bind(line.book_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", line.book_id)))?;

        sqlx::query(
            r#"
            INSERT INTO inventory_check_lines (check_id, book_id, system_quantity, actual_quantity, variance, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (check_id, book_id) DO UPDATE
            SET system_quantity = EXCLUDED.system_quantity,
                actual_quantity = EXCLUDED.actual_quantity,
                variance = EXCLUDED.variance,
                note = EXCLUDED.note
            "#,
        )
        .bind(check_id)
        .bind(line.book_id)
        .bind(system)
        .bind(line.actual_quantity)
        .bind(variance(system, line.actual_quantity))
        .bind(&line.note)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
