//! Violations repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use super::{readers, receipts, where_clause};
use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        violation::{CreateViolation, FineAssessment, ViolationQuery, ViolationStats},
        AmountEntry, Page, StatEntry, Violation, ViolationStatus,
    },
};

const SELECT_VIOLATION: &str = r#"
    SELECT v.id, v.reader_id, d.full_name AS reader_name, v.ticket_id, v.book_id, v.kind,
           v.severity, v.days_late, v.fine_amount, v.status, v.description, v.processed_at,
           v.created_at, v.updated_at
    FROM violations v
    JOIN readers d ON d.id = v.reader_id
"#;

#[derive(Clone)]
pub struct ViolationsRepository {
    pool: Pool<Postgres>,
}

impl ViolationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &ViolationQuery, page: Page) -> AppResult<(Vec<Violation>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.reader_id.is_some() {
            conditions.push(format!("v.reader_id = ${}", idx));
            idx += 1;
        }
        if query.kind.is_some() {
            conditions.push(format!("v.kind = ${}", idx));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("v.status = ${}", idx));
            idx += 1;
        }
        if query.from.is_some() {
            conditions.push(format!("v.created_at::date >= ${}", idx));
            idx += 1;
        }
        if query.to.is_some() {
            conditions.push(format!("v.created_at::date <= ${}", idx));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(v) = query.reader_id { builder = builder.bind(v); }
                if let Some(v) = query.kind { builder = builder.bind(v); }
                if let Some(v) = query.status { builder = builder.bind(v); }
                if let Some(v) = query.from { builder = builder.bind(v); }
                if let Some(v) = query.to { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM violations v {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "{} {} ORDER BY v.created_at DESC, v.id DESC LIMIT {} OFFSET {}",
            SELECT_VIOLATION,
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, Violation>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Violation> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, id).await
    }

    /// Every violation of one reader, newest first
    pub async fn for_reader(&self, reader_id: i32) -> AppResult<Vec<Violation>> {
        let query = format!("{} WHERE v.reader_id = $1 ORDER BY v.created_at DESC, v.id DESC", SELECT_VIOLATION);
        let rows = sqlx::query_as::<_, Violation>(&query)
            .bind(reader_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Fine totals of one reader: (outstanding, paid)
    pub async fn fine_totals(&self, reader_id: i32) -> AppResult<(Decimal, Decimal)> {
        let totals: (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0),
                   COALESCE(SUM(amount) FILTER (WHERE status = 'collected'), 0)
            FROM receipts
            WHERE reader_id = $1 AND kind = 'fine'
            "#,
        )
        .bind(reader_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    /// Record a manually reported violation and its fine receipt
    pub async fn create(
        &self,
        data: &CreateViolation,
        fine: &FineAssessment,
        now: DateTime<Utc>,
    ) -> AppResult<(Violation, i32)> {
        let mut tx = self.pool.begin().await?;

        readers::get(&mut tx, data.reader_id).await?;
        let (violation_id, receipt_id) = insert_assessed(
            &mut tx,
            data.reader_id,
            data.ticket_id,
            data.book_id,
            fine,
            data.description.as_deref(),
            now,
        )
        .await?;

        let violation = get(&mut tx, violation_id).await?;
        tx.commit().await?;
        Ok((violation, receipt_id))
    }

    pub async fn update_description(&self, id: i32, description: Option<&str>) -> AppResult<Violation> {
        let result = sqlx::query("UPDATE violations SET description = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(description)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Violation with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    /// Delete a pending violation, cancelling its uncollected fine
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let status = lock(&mut tx, id).await?;
        if status == ViolationStatus::Processed {
            return Err(AppError::rule(
                ErrorCode::AlreadyProcessed,
                "Processed violations cannot be deleted",
            ));
        }

        sqlx::query(
            "UPDATE receipts SET status = 'cancelled', updated_at = NOW() WHERE violation_id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM violations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Close a pending violation
    pub async fn process(&self, id: i32, now: DateTime<Utc>) -> AppResult<Violation> {
        let mut tx = self.pool.begin().await?;
        let status = lock(&mut tx, id).await?;
        if status == ViolationStatus::Processed {
            return Err(AppError::rule(
                ErrorCode::AlreadyProcessed,
                format!("Violation {} is already processed", id),
            ));
        }

        sqlx::query("UPDATE violations SET status = $2, processed_at = $3, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(ViolationStatus::Processed)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let violation = get(&mut tx, id).await?;
        tx.commit().await?;
        Ok(violation)
    }

    pub async fn stats(&self) -> AppResult<ViolationStats> {
        let (total, pending): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'pending') FROM violations",
        )
        .fetch_one(&self.pool)
        .await?;

        let by_kind = sqlx::query_as::<_, StatEntry>(
            "SELECT kind AS label, COUNT(*)::bigint AS value FROM violations GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_severity = sqlx::query_as::<_, StatEntry>(
            "SELECT severity AS label, COUNT(*)::bigint AS value FROM violations GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let fines_by_kind = sqlx::query_as::<_, AmountEntry>(
            "SELECT kind AS label, COALESCE(SUM(fine_amount), 0) AS amount FROM violations GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ViolationStats {
            total,
            pending,
            by_kind,
            by_severity,
            fines_by_kind,
        })
    }
}

async fn get(conn: &mut PgConnection, id: i32) -> AppResult<Violation> {
    let query = format!("{} WHERE v.id = $1", SELECT_VIOLATION);
    sqlx::query_as::<_, Violation>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Violation with id {} not found", id)))
}

async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<ViolationStatus> {
    sqlx::query_scalar::<_, ViolationStatus>("SELECT status FROM violations WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Violation with id {} not found", id)))
}

/// Insert a violation with its pending fine receipt; returns both ids
pub(crate) async fn insert_assessed(
    conn: &mut PgConnection,
    reader_id: i32,
    ticket_id: Option<i32>,
    book_id: Option<i32>,
    fine: &FineAssessment,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<(i32, i32)> {
    let violation_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO violations (
            reader_id, ticket_id, book_id, kind, severity, days_late, fine_amount,
            status, description, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING id
        "#,
    )
    .bind(reader_id)
    .bind(ticket_id)
    .bind(book_id)
    .bind(fine.kind)
    .bind(fine.severity)
    .bind(fine.days_late)
    .bind(fine.total)
    .bind(ViolationStatus::Pending)
    .bind(description)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    let notes = format!("{} fine ({}), {} day(s) late", fine.kind, fine.severity, fine.days_late);
    let receipt_id = receipts::insert_fine(conn, reader_id, violation_id, fine.total, &notes).await?;

    Ok((violation_id, receipt_id))
}
