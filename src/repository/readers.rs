//! Readers repository for database operations

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use super::{like_pattern, receipts, where_clause};
use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        reader::{BorrowLimits, CreateReader, Reader, ReaderQuery, ReaderStats, UpdateReader},
        MembershipStatus, MembershipTier, Page, Receipt, ReceiptKind, ReceiptStatus, StatEntry,
    },
    rules,
};

#[derive(Clone)]
pub struct ReadersRepository {
    pool: Pool<Postgres>,
}

impl ReadersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search readers with pagination
    pub async fn list(&self, query: &ReaderQuery, page: Page) -> AppResult<(Vec<Reader>, i64)> {
        let search = like_pattern(&query.search);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if search.is_some() {
            conditions.push(format!(
                "(LOWER(full_name) LIKE ${0} OR LOWER(COALESCE(email, '')) LIKE ${0} OR COALESCE(phone, '') LIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.membership_status.is_some() {
            conditions.push(format!("membership_status = ${}", idx));
            idx += 1;
        }
        if query.membership_tier.is_some() {
            conditions.push(format!("membership_tier = ${}", idx));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(ref v) = search { builder = builder.bind(v); }
                if let Some(v) = query.membership_status { builder = builder.bind(v); }
                if let Some(v) = query.membership_tier { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM readers {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "SELECT * FROM readers {} ORDER BY full_name, id LIMIT {} OFFSET {}",
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, Reader>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Reader> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, id).await
    }

    /// Create a new reader; membership starts unpaid
    pub async fn create(&self, data: &CreateReader, tier: MembershipTier, limits: BorrowLimits) -> AppResult<Reader> {
        let reader = sqlx::query_as::<_, Reader>(
            r#"
            INSERT INTO readers (
                full_name, email, phone, address, birth_date, membership_tier,
                membership_status, max_books, max_borrow_days, max_renewals, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(data.full_name.trim())
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(data.birth_date)
        .bind(tier)
        .bind(MembershipStatus::Unpaid)
        .bind(limits.max_books)
        .bind(limits.max_borrow_days)
        .bind(limits.max_renewals)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(reader)
    }

    /// Update profile and limits; membership status is left to its workflows
    pub async fn update(&self, id: i32, data: &UpdateReader) -> AppResult<Reader> {
        let now = Utc::now();
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.full_name, "full_name");
        add_field!(data.email, "email");
        add_field!(data.phone, "phone");
        add_field!(data.address, "address");
        add_field!(data.birth_date, "birth_date");
        add_field!(data.membership_tier, "membership_tier");
        add_field!(data.max_books, "max_books");
        add_field!(data.max_borrow_days, "max_borrow_days");
        add_field!(data.max_renewals, "max_renewals");
        add_field!(data.notes, "notes");

        let query = format!("UPDATE readers SET {} WHERE id = {} RETURNING *", sets.join(", "), id);

        let mut builder = sqlx::query_as::<_, Reader>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.full_name);
        bind_field!(data.email);
        bind_field!(data.phone);
        bind_field!(data.address);
        bind_field!(data.birth_date);
        bind_field!(data.membership_tier);
        bind_field!(data.max_books);
        bind_field!(data.max_borrow_days);
        bind_field!(data.max_renewals);
        bind_field!(data.notes);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", id)))
    }

    /// Delete a reader with no books out
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let reader = self.get_by_id(id).await?;
        let outstanding = self.outstanding_books(id).await?;
        if outstanding > 0 {
            return Err(AppError::rule(
                ErrorCode::ReaderHasBorrowedBooks,
                format!("{} still has {} borrowed books", reader.full_name, outstanding),
            ));
        }

        sqlx::query("DELETE FROM readers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn outstanding_books(&self, reader_id: i32) -> AppResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_outstanding(&mut conn, reader_id).await
    }

    /// Issue a membership fee receipt, switching tier first when asked
    pub async fn request_membership(
        &self,
        id: i32,
        tier: Option<MembershipTier>,
        months: i32,
        today: NaiveDate,
    ) -> AppResult<Receipt> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let reader = lock(&mut tx, id).await?;
        let status = rules::membership::status_while_fee_pending(
            reader.membership_status,
            reader.membership_expiry,
            today,
        )?;

        let tier = match tier {
            Some(tier) if tier != reader.membership_tier => {
                let limits = tier.default_limits();
                sqlx::query(
                    r#"
                    UPDATE readers
                    SET membership_tier = $2, max_books = $3, max_borrow_days = $4, max_renewals = $5
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(tier)
                .bind(limits.max_books)
                .bind(limits.max_borrow_days)
                .bind(limits.max_renewals)
                .execute(&mut *tx)
                .await?;
                tier
            }
            _ => reader.membership_tier,
        };

        sqlx::query("UPDATE readers SET membership_status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let amount = tier.monthly_fee() * Decimal::from(months);
        let receipt_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO receipts (reader_id, kind, amount, status, membership_months, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(ReceiptKind::MembershipFee)
        .bind(amount)
        .bind(ReceiptStatus::Pending)
        .bind(months)
        .bind(format!("{} membership, {} month(s)", tier, months))
        .fetch_one(&mut *tx)
        .await?;

        let receipt = receipts::get(&mut tx, receipt_id).await?;
        tx.commit().await?;
        Ok(receipt)
    }

    /// Lock a reader account, or lift the lock
    pub async fn set_locked(&self, id: i32, locked: bool, today: NaiveDate) -> AppResult<Reader> {
        let mut tx = self.pool.begin().await?;
        let reader = lock(&mut tx, id).await?;

        let status = if locked {
            MembershipStatus::Locked
        } else if reader.membership_status == MembershipStatus::Locked {
            rules::membership::status_after_unlock(reader.membership_expiry, today)
        } else {
            return Err(AppError::rule(
                ErrorCode::AlreadyProcessed,
                format!("{} is not locked", reader.full_name),
            ));
        };

        let reader = sqlx::query_as::<_, Reader>(
            "UPDATE readers SET membership_status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reader)
    }

    /// Mark paid memberships past their expiry date as expired
    pub async fn expire_memberships(&self, today: NaiveDate) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE readers SET membership_status = $1, updated_at = NOW()
            WHERE membership_status = 'paid' AND membership_expiry < $2
            "#,
        )
        .bind(MembershipStatus::Expired)
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn stats(&self, today: NaiveDate) -> AppResult<ReaderStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers")
            .fetch_one(&self.pool)
            .await?;

        let by_status = sqlx::query_as::<_, StatEntry>(
            "SELECT membership_status AS label, COUNT(*)::bigint AS value FROM readers GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_tier = sqlx::query_as::<_, StatEntry>(
            "SELECT membership_tier AS label, COUNT(*)::bigint AS value FROM readers GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let active_borrowers: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT t.reader_id)
            FROM borrow_tickets t
            JOIN borrow_lines l ON l.ticket_id = t.id
            WHERE l.returned_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let expiring_soon: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM readers
            WHERE membership_status = 'paid'
              AND membership_expiry BETWEEN $1 AND $1 + 30
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(ReaderStats {
            total,
            by_status,
            by_tier,
            active_borrowers,
            expiring_soon,
        })
    }
}

pub(crate) async fn get(conn: &mut PgConnection, id: i32) -> AppResult<Reader> {
    sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", id)))
}

/// Lock a reader row for the rest of the transaction
pub(crate) async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<Reader> {
    sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", id)))
}

/// Books the reader has not returned yet
pub(crate) async fn count_outstanding(conn: &mut PgConnection, reader_id: i32) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM borrow_lines l
        JOIN borrow_tickets t ON t.id = l.ticket_id
        WHERE t.reader_id = $1 AND l.returned_at IS NULL
        "#,
    )
    .bind(reader_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}
