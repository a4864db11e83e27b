//! Stock-in repository: goods received from suppliers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use super::{books, like_pattern, reservations, where_clause};
use crate::{
    error::{AppError, AppResult},
    models::{
        stock_in::{
            CreateStockIn, StockIn, StockInDetails, StockInLine, StockInQuery, StockInStats,
            UpdateStockIn,
        },
        AmountEntry, Page,
    },
    rules::inventory::Stock,
};

#[derive(Clone)]
pub struct StockInsRepository {
    pool: Pool<Postgres>,
}

impl StockInsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &StockInQuery, page: Page) -> AppResult<(Vec<StockIn>, i64)> {
        let supplier = like_pattern(&query.supplier);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if supplier.is_some() {
            conditions.push(format!("LOWER(supplier) LIKE ${}", idx));
            idx += 1;
        }
        if query.from.is_some() {
            conditions.push(format!("received_at::date >= ${}", idx));
            idx += 1;
        }
        if query.to.is_some() {
            conditions.push(format!("received_at::date <= ${}", idx));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(ref v) = supplier { builder = builder.bind(v); }
                if let Some(v) = query.from { builder = builder.bind(v); }
                if let Some(v) = query.to { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM stock_ins {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "SELECT * FROM stock_ins {} ORDER BY received_at DESC, id DESC LIMIT {} OFFSET {}",
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, StockIn>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_details(&self, id: i32) -> AppResult<StockInDetails> {
        let mut conn = self.pool.acquire().await?;
        get_details(&mut conn, id).await
    }

    /// Record a delivery and put its copies on the shelf
    pub async fn create(
        &self,
        data: &CreateStockIn,
        total_amount: Decimal,
        created_by: Option<i32>,
        hold_days: i64,
        now: DateTime<Utc>,
    ) -> AppResult<(StockInDetails, Vec<i32>)> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO stock_ins (supplier, received_at, total_amount, notes, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id
            "#,
        )
        .bind(data.supplier.trim())
        .bind(data.received_at.unwrap_or(now))
        .bind(total_amount)
        .bind(&data.notes)
        .bind(created_by)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = data.lines.clone();
        lines.sort_by_key(|l| l.book_id);

        let mut promoted = Vec::new();
        for line in &lines {
            let book = books::lock(&mut tx, line.book_id).await?;
            let stock = Stock::new(book.total_quantity, book.available_quantity).adjust(line.quantity)?;
            books::save_stock(&mut tx, line.book_id, stock, now).await?;

            sqlx::query(
                "INSERT INTO stock_in_lines (stock_in_id, book_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(line.book_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;

            promoted.extend(reservations::promote(&mut tx, line.book_id, hold_days, now).await?);
        }

        let details = get_details(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!("Stock-in {} from {}: {} line(s)", id, details.stock_in.supplier, lines.len());
        Ok((details, promoted))
    }

    pub async fn update(&self, id: i32, data: &UpdateStockIn) -> AppResult<StockInDetails> {
        let result = sqlx::query(
            r#"
            UPDATE stock_ins
            SET supplier = COALESCE($2, supplier), notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.supplier.as_deref().map(str::trim))
        .bind(&data.notes)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Stock-in with id {} not found", id)));
        }
        self.get_details(id).await
    }

    /// Undo a delivery; fails when its copies have already left the shelf
    pub async fn delete(&self, id: i32, now: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM stock_ins WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Stock-in with id {} not found", id)));
        }

        let lines: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT book_id, quantity FROM stock_in_lines WHERE stock_in_id = $1 ORDER BY book_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for (book_id, quantity) in lines {
            let book = books::lock(&mut tx, book_id).await?;
            let stock = Stock::new(book.total_quantity, book.available_quantity).adjust(-quantity)?;
            books::save_stock(&mut tx, book_id, stock, now).await?;
        }

        sqlx::query("DELETE FROM stock_ins WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<StockInStats> {
        let (receipts, total_spent): (i64, Decimal) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(total_amount), 0) FROM stock_ins")
                .fetch_one(&self.pool)
                .await?;

        let copies_received: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0)::bigint FROM stock_in_lines")
                .fetch_one(&self.pool)
                .await?;

        let by_supplier = sqlx::query_as::<_, AmountEntry>(
            r#"
            SELECT supplier AS label, COALESCE(SUM(total_amount), 0) AS amount
            FROM stock_ins
            GROUP BY supplier
            ORDER BY amount DESC, supplier
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StockInStats {
            receipts,
            copies_received,
            total_spent,
            by_supplier,
        })
    }
}

async fn get_details(conn: &mut PgConnection, id: i32) -> AppResult<StockInDetails> {
    let stock_in = sqlx::query_as::<_, StockIn>("SELECT * FROM stock_ins WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Stock-in with id {} not found", id)))?;

    let lines = sqlx::query_as::<_, StockInLine>(
        r#"
        SELECT l.id, l.stock_in_id, l.book_id, b.title AS book_title, l.quantity, l.unit_price
        FROM stock_in_lines l
        JOIN books b ON b.id = l.book_id
        WHERE l.stock_in_id = $1
        ORDER BY l.id
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(StockInDetails { stock_in, lines })
}
