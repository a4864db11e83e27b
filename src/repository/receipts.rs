//! Receipts repository: membership fees and fines

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use super::{readers, where_clause};
use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        receipt::{CreateReceipt, ReceiptQuery, ReceiptStats, UpdateReceipt},
        AmountEntry, Page, Receipt, ReceiptKind, ReceiptStatus, ViolationStatus,
    },
    rules,
};

const SELECT_RECEIPT: &str = r#"
    SELECT p.id, p.reader_id, d.full_name AS reader_name, p.kind, p.amount, p.status,
           p.violation_id, p.membership_months, p.collected_by, p.collected_at, p.notes,
           p.created_at, p.updated_at
    FROM receipts p
    LEFT JOIN readers d ON d.id = p.reader_id
"#;

#[derive(Clone)]
pub struct ReceiptsRepository {
    pool: Pool<Postgres>,
}

impl ReceiptsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List receipts, newest first
    pub async fn list(&self, query: &ReceiptQuery, page: Page) -> AppResult<(Vec<Receipt>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.reader_id.is_some() {
            conditions.push(format!("p.reader_id = ${}", idx));
            idx += 1;
        }
        if query.kind.is_some() {
            conditions.push(format!("p.kind = ${}", idx));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("p.status = ${}", idx));
            idx += 1;
        }
        if query.from.is_some() {
            conditions.push(format!("p.created_at::date >= ${}", idx));
            idx += 1;
        }
        if query.to.is_some() {
            conditions.push(format!("p.created_at::date <= ${}", idx));
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

        let count_q = format!("SELECT COUNT(*) FROM receipts p {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "{} {} ORDER BY p.created_at DESC, p.id DESC LIMIT {} OFFSET {}",
            SELECT_RECEIPT,
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, Receipt>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Receipt> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, id).await
    }

    /// Pending fine receipt raised for a violation, if any
    pub async fn pending_for_violation(&self, violation_id: i32) -> AppResult<Option<Receipt>> {
        let query = format!(
            "{} WHERE p.violation_id = $1 AND p.status = 'pending' ORDER BY p.id LIMIT 1",
            SELECT_RECEIPT
        );
        let receipt = sqlx::query_as::<_, Receipt>(&query)
            .bind(violation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(receipt)
    }

    pub async fn create(&self, data: &CreateReceipt) -> AppResult<Receipt> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO receipts (reader_id, kind, amount, status, violation_id, membership_months, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(data.reader_id)
        .bind(data.kind)
        .bind(data.amount)
        .bind(ReceiptStatus::Pending)
        .bind(data.violation_id)
        .bind(data.membership_months)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        self.get_by_id(id).await
    }

    /// Correct amount or notes of a pending receipt
    pub async fn update(&self, id: i32, data: &UpdateReceipt) -> AppResult<Receipt> {
        let mut tx = self.pool.begin().await?;
        let receipt = lock(&mut tx, id).await?;
        ensure_pending(&receipt)?;

        sqlx::query(
            r#"
            UPDATE receipts
            SET amount = COALESCE($2, amount), notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.amount)
        .bind(&data.notes)
        .execute(&mut *tx)
        .await?;

        let receipt = get(&mut tx, id).await?;
        tx.commit().await?;
        Ok(receipt)
    }

    /// Delete a receipt that was never collected
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let receipt = self.get_by_id(id).await?;
        if receipt.status == ReceiptStatus::Collected {
            return Err(AppError::rule(
                ErrorCode::AlreadyProcessed,
                "Collected receipts cannot be deleted",
            ));
        }
        sqlx::query("DELETE FROM receipts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Collect a pending receipt. A membership fee activates or extends the
    /// reader's membership; a fine closes its violation.
    pub async fn collect(
        &self,
        id: i32,
        collected_by: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Receipt> {
        let mut tx = self.pool.begin().await?;
        let receipt = lock(&mut tx, id).await?;
        ensure_pending(&receipt)?;

        sqlx::query(
            r#"
            UPDATE receipts SET status = $2, collected_by = $3, collected_at = $4, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ReceiptStatus::Collected)
        .bind(collected_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        match (receipt.kind, receipt.reader_id, receipt.violation_id) {
            (ReceiptKind::MembershipFee, Some(reader_id), _) => {
                let reader = readers::lock(&mut tx, reader_id).await?;
                let status = rules::membership::status_after_fee_collected(reader.membership_status)?;
                let months = receipt.membership_months.unwrap_or(1).max(1) as u32;
                let expiry = rules::membership::extend_expiry(
                    reader.membership_expiry,
                    now.date_naive(),
                    months,
                );
                sqlx::query(
                    r#"
                    UPDATE readers SET membership_status = $2, membership_expiry = $3, updated_at = $4
                    WHERE id = $1
                    "#,
                )
                .bind(reader_id)
                .bind(status)
                .bind(expiry)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                tracing::info!("Membership of reader {} paid until {}", reader_id, expiry);
            }
            (ReceiptKind::Fine, _, Some(violation_id)) => {
                sqlx::query(
                    r#"
                    UPDATE violations SET status = $2, processed_at = $3, updated_at = $3
                    WHERE id = $1 AND status = 'pending'
                    "#,
                )
                .bind(violation_id)
                .bind(ViolationStatus::Processed)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            _ => {}
        }

        let receipt = get(&mut tx, id).await?;
        tx.commit().await?;
        Ok(receipt)
    }

    /// Cancel a pending receipt
    pub async fn cancel(&self, id: i32) -> AppResult<Receipt> {
        let mut tx = self.pool.begin().await?;
        let receipt = lock(&mut tx, id).await?;
        ensure_pending(&receipt)?;

        sqlx::query("UPDATE receipts SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(ReceiptStatus::Cancelled)
            .execute(&mut *tx)
            .await?;

        let receipt = get(&mut tx, id).await?;
        tx.commit().await?;
        Ok(receipt)
    }

    /// Totals over receipts created in the period, optionally of one kind
    pub async fn stats(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        kind: Option<ReceiptKind>,
    ) -> AppResult<ReceiptStats> {
        let (collected_total, collected_count, pending_total, pending_count): (Decimal, i64, Decimal, i64) =
            sqlx::query_as(
                r#"
                SELECT COALESCE(SUM(amount) FILTER (WHERE status = 'collected'), 0),
                       COUNT(*) FILTER (WHERE status = 'collected'),
                       COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0),
                       COUNT(*) FILTER (WHERE status = 'pending')
                FROM receipts
                WHERE created_at::date BETWEEN $1 AND $2
                  AND ($3::text IS NULL OR kind = $3)
                "#,
            )
            .bind(from)
            .bind(to)
            .bind(kind)
            .fetch_one(&self.pool)
            .await?;

        let collected_by_kind = sqlx::query_as::<_, AmountEntry>(
            r#"
            SELECT kind AS label, COALESCE(SUM(amount), 0) AS amount
            FROM receipts
            WHERE status = 'collected' AND created_at::date BETWEEN $1 AND $2
              AND ($3::text IS NULL OR kind = $3)
            GROUP BY kind
            ORDER BY kind
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(ReceiptStats {
            from,
            to,
            collected_total,
            pending_total,
            collected_by_kind,
            collected_count,
            pending_count,
        })
    }
}

fn ensure_pending(receipt: &Receipt) -> AppResult<()> {
    if receipt.status != ReceiptStatus::Pending {
        return Err(AppError::rule(
            ErrorCode::AlreadyProcessed,
            format!("Receipt {} is already {}", receipt.id, receipt.status),
        ));
    }
    Ok(())
}

pub(crate) async fn get(conn: &mut PgConnection, id: i32) -> AppResult<Receipt> {
    let query = format!("{} WHERE p.id = $1", SELECT_RECEIPT);
    sqlx::query_as::<_, Receipt>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Receipt with id {} not found", id)))
}

async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<Receipt> {
    let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM receipts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound(format!("Receipt with id {} not found", id)));
    }
    get(conn, id).await
}

/// Insert a pending fine receipt inside a running transaction
pub(crate) async fn insert_fine(
    conn: &mut PgConnection,
    reader_id: i32,
    violation_id: i32,
    amount: Decimal,
    notes: &str,
) -> AppResult<i32> {
    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO receipts (reader_id, kind, amount, status, violation_id, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(reader_id)
    .bind(ReceiptKind::Fine)
    .bind(amount)
    .bind(ReceiptStatus::Pending)
    .bind(violation_id)
    .bind(notes)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}
