//! Reservations repository: hold queue per book

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use super::{books, readers, where_clause};
use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        reservation::{CreateReservation, HoldNotice, Reservation, ReservationQuery, ReservationStats},
        Page, ReservationStatus, StatEntry,
    },
    rules,
};

const SELECT_RESERVATION: &str = r#"
    SELECT r.id, r.reader_id, d.full_name AS reader_name, r.book_id, b.title AS book_title,
           r.reserved_at, r.hold_expires_at, r.status, r.notes, r.created_at, r.updated_at
    FROM reservations r
    JOIN readers d ON d.id = r.reader_id
    JOIN books b ON b.id = r.book_id
"#;

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List reservations, oldest first
    pub async fn list(&self, query: &ReservationQuery, page: Page) -> AppResult<(Vec<Reservation>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.reader_id.is_some() {
            conditions.push(format!("r.reader_id = ${}", idx));
            idx += 1;
        }
        if query.book_id.is_some() {
            conditions.push(format!("r.book_id = ${}", idx));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("r.status = ${}", idx));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(v) = query.reader_id { builder = builder.bind(v); }
                if let Some(v) = query.book_id { builder = builder.bind(v); }
                if let Some(v) = query.status { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM reservations r {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "{} {} ORDER BY r.reserved_at, r.id LIMIT {} OFFSET {}",
            SELECT_RESERVATION,
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, Reservation>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        let query = format!("{} WHERE r.id = $1", SELECT_RESERVATION);
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    pub async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Reservation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("{} WHERE r.id = ANY($1) ORDER BY r.reserved_at, r.id", SELECT_RESERVATION);
        let rows = sqlx::query_as::<_, Reservation>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Active reservations of a book in queue order
    pub async fn queue(&self, book_id: i32) -> AppResult<Vec<Reservation>> {
        let query = format!(
            "{} WHERE r.book_id = $1 AND r.status IN ('pending', 'ready_for_pickup') ORDER BY r.reserved_at, r.id",
            SELECT_RESERVATION
        );
        let rows = sqlx::query_as::<_, Reservation>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Queue a reader for a book with no copy on the shelf
    pub async fn create(&self, data: &CreateReservation, now: DateTime<Utc>) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let book = books::lock(&mut tx, data.book_id).await?;
        let held = books::held_for_others(&mut tx, data.book_id, data.reader_id).await?;
        rules::reservations::check_reservable(&book.title, book.status, book.available_quantity, held)?;

        let reader = readers::get(&mut tx, data.reader_id).await?;
        rules::borrowing::check_membership(&reader, now.date_naive())?;

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE reader_id = $1 AND book_id = $2 AND status IN ('pending', 'ready_for_pickup')
            )
            "#,
        )
        .bind(data.reader_id)
        .bind(data.book_id)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(AppError::rule(
                ErrorCode::ReservationExists,
                format!("{} already has an active reservation for '{}'", reader.full_name, book.title),
            ));
        }

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO reservations (reader_id, book_id, reserved_at, status, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $3, $3)
            RETURNING id
            "#,
        )
        .bind(data.reader_id)
        .bind(data.book_id)
        .bind(now)
        .bind(ReservationStatus::Pending)
        .bind(&data.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_by_id(id).await
    }

    pub async fn update_notes(&self, id: i32, notes: Option<&str>) -> AppResult<Reservation> {
        let result = sqlx::query("UPDATE reservations SET notes = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(notes)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reservation with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    /// Cancel an active reservation; a released hold goes to the next reader
    pub async fn cancel(&self, id: i32, hold_days: i64, now: DateTime<Utc>) -> AppResult<Vec<i32>> {
        let mut tx = self.pool.begin().await?;

        let (book_id, status) = lock(&mut tx, id).await?;
        rules::reservations::check_cancellable(status)?;

        sqlx::query("UPDATE reservations SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(ReservationStatus::Cancelled)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let promoted = if status == ReservationStatus::ReadyForPickup {
            books::lock(&mut tx, book_id).await?;
            promote(&mut tx, book_id, hold_days, now).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;
        Ok(promoted)
    }

    /// Delete a reservation record; a released hold goes to the next reader
    pub async fn delete(&self, id: i32, hold_days: i64, now: DateTime<Utc>) -> AppResult<Vec<i32>> {
        let mut tx = self.pool.begin().await?;

        let (book_id, status) = lock(&mut tx, id).await?;
        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let promoted = if status == ReservationStatus::ReadyForPickup {
            books::lock(&mut tx, book_id).await?;
            promote(&mut tx, book_id, hold_days, now).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;
        Ok(promoted)
    }

    /// Expire ready holds past their pickup date and promote the next readers
    pub async fn expire(&self, hold_days: i64, now: DateTime<Utc>) -> AppResult<(i64, Vec<i32>)> {
        let mut tx = self.pool.begin().await?;

        let book_ids: Vec<i32> = sqlx::query_scalar(
            r#"
            UPDATE reservations SET status = $1, updated_at = $2
            WHERE status = 'ready_for_pickup' AND hold_expires_at < $2
            RETURNING book_id
            "#,
        )
        .bind(ReservationStatus::Expired)
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        let expired = book_ids.len() as i64;
        let mut distinct = book_ids;
        distinct.sort_unstable();
        distinct.dedup();

        let mut promoted = Vec::new();
        for book_id in distinct {
            books::lock(&mut tx, book_id).await?;
            promoted.extend(promote(&mut tx, book_id, hold_days, now).await?);
        }

        tx.commit().await?;
        Ok((expired, promoted))
    }

    /// Contact details of the readers behind the given reservations
    pub async fn hold_notices(&self, ids: &[i32]) -> AppResult<Vec<HoldNotice>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, HoldNotice>(
            r#"
            SELECT r.id AS reservation_id, d.full_name AS reader_name, d.email AS reader_email,
                   b.title AS book_title, r.hold_expires_at
            FROM reservations r
            JOIN readers d ON d.id = r.reader_id
            JOIN books b ON b.id = r.book_id
            WHERE r.id = ANY($1)
            ORDER BY r.id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn stats(&self) -> AppResult<ReservationStats> {
        let by_status = sqlx::query_as::<_, StatEntry>(
            "SELECT status AS label, COUNT(*)::bigint AS value FROM reservations GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let count_of = |status: ReservationStatus| {
            by_status
                .iter()
                .find(|e| e.label == status.as_str())
                .map_or(0, |e| e.value)
        };
        let pending = count_of(ReservationStatus::Pending);
        let ready_for_pickup = count_of(ReservationStatus::ReadyForPickup);

        let most_reserved = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT b.title AS label, COUNT(*)::bigint AS value
            FROM reservations r
            JOIN books b ON b.id = r.book_id
            WHERE r.status IN ('pending', 'ready_for_pickup')
            GROUP BY b.id, b.title
            ORDER BY value DESC, b.title
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ReservationStats {
            pending,
            ready_for_pickup,
            by_status,
            most_reserved,
        })
    }
}

/// Lock a reservation row, returning its book and status
async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<(i32, ReservationStatus)> {
    sqlx::query_as::<_, (i32, ReservationStatus)>(
        "SELECT book_id, status FROM reservations WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
}

/// Move the oldest pending reservations of a book to ready, as many as there
/// are unheld copies on the shelf. Callers hold the book row lock.
pub(crate) async fn promote(
    conn: &mut PgConnection,
    book_id: i32,
    hold_days: i64,
    now: DateTime<Utc>,
) -> AppResult<Vec<i32>> {
    let (available, ready): (i32, i64) = sqlx::query_as(
        r#"
        SELECT b.available_quantity,
               (SELECT COUNT(*) FROM reservations r
                WHERE r.book_id = b.id AND r.status = 'ready_for_pickup')::bigint
        FROM books b
        WHERE b.id = $1 AND b.status = 'active'
        "#,
    )
    .bind(book_id)
    .fetch_optional(&mut *conn)
    .await?
    .unwrap_or((0, 0));

    let slots = rules::reservations::promotable(available, ready);
    if slots == 0 {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = sqlx::query_scalar(
        r#"
        UPDATE reservations SET status = $3, hold_expires_at = $4, updated_at = $5
        WHERE id IN (
            SELECT id FROM reservations
            WHERE book_id = $1 AND status = 'pending'
            ORDER BY reserved_at, id
            LIMIT $2
            FOR UPDATE
        )
        RETURNING id
        "#,
    )
    .bind(book_id)
    .bind(slots)
    .bind(ReservationStatus::ReadyForPickup)
    .bind(rules::reservations::hold_expiry(now, hold_days))
    .bind(now)
    .fetch_all(&mut *conn)
    .await?;

    if !ids.is_empty() {
        tracing::info!("Book {}: {} reservation(s) ready for pickup", book_id, ids.len());
    }
    Ok(ids)
}

/// Close the reader's active reservation for a book they just borrowed
pub(crate) async fn fulfil_for_reader(
    conn: &mut PgConnection,
    reader_id: i32,
    book_id: i32,
    now: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE reservations SET status = $3, updated_at = $4
        WHERE reader_id = $1 AND book_id = $2 AND status IN ('pending', 'ready_for_pickup')
        "#,
    )
    .bind(reader_id)
    .bind(book_id)
    .bind(ReservationStatus::Fulfilled)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
