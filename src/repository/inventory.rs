//! Stock levels per title and manual quantity adjustments

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::{books, like_pattern, reservations, where_clause};
use crate::{
    error::{AppError, AppResult},
    models::{
        inventory::{InventoryStats, StockLevel, StockQuery},
        Page, StatEntry,
    },
    rules::inventory::Stock,
};

const SELECT_LEVEL: &str = r#"
    SELECT b.id AS book_id, b.title, b.category, b.shelf_location, b.total_quantity,
           b.available_quantity, b.total_quantity - b.available_quantity AS borrowed_quantity,
           (SELECT COUNT(*) FROM reservations r
            WHERE r.book_id = b.id AND r.status = 'ready_for_pickup') AS held_quantity,
           (SELECT COUNT(*) FROM reservations r
            WHERE r.book_id = b.id AND r.status = 'pending') AS waiting_reservations
    FROM books b
"#;

#[derive(Clone)]
pub struct InventoryRepository {
    pool: Pool<Postgres>,
}

impl InventoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Stock levels, optionally only titles at or below `low_stock` available copies
    pub async fn levels(
        &self,
        query: &StockQuery,
        low_stock: Option<i32>,
        page: Page,
    ) -> AppResult<(Vec<StockLevel>, i64)> {
        let search = like_pattern(&query.search);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if search.is_some() {
            conditions.push(format!("LOWER(b.title) LIKE ${}", idx));
            idx += 1;
        }
        if query.category.is_some() {
            conditions.push(format!("LOWER(b.category) = LOWER(${})", idx));
            idx += 1;
        }
        if low_stock.is_some() {
            conditions.push(format!("b.status = 'active' AND b.available_quantity <= ${}", idx));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(ref v) = search { builder = builder.bind(v); }
                if let Some(ref v) = query.category { builder = builder.bind(v); }
                if let Some(v) = low_stock { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM books b {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let order = if low_stock.is_some() {
            "b.available_quantity, b.title"
        } else {
            "b.title"
        };
        let select_q = format!(
            "{} {} ORDER BY {} LIMIT {} OFFSET {}",
            SELECT_LEVEL,
            where_clause,
            order,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, StockLevel>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get(&self, book_id: i32) -> AppResult<StockLevel> {
        let query = format!("{} WHERE b.id = $1", SELECT_LEVEL);
        sqlx::query_as::<_, StockLevel>(&query)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    /// Add or write off copies outside of deliveries and checks
    pub async fn adjust(
        &self,
        book_id: i32,
        delta: i32,
        reason: &str,
        hold_days: i64,
        now: DateTime<Utc>,
    ) -> AppResult<(StockLevel, Vec<i32>)> {
        let mut tx = self.pool.begin().await?;

        let book = books::lock(&mut tx, book_id).await?;
        let stock = Stock::new(book.total_quantity, book.available_quantity).adjust(delta)?;
        books::save_stock(&mut tx, book_id, stock, now).await?;

        let promoted = if delta > 0 {
            reservations::promote(&mut tx, book_id, hold_days, now).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;
        tracing::info!(
            "Stock of book {} adjusted by {} ({}): {}/{} available",
            book_id,
            delta,
            reason,
            stock.available,
            stock.total
        );

        Ok((self.get(book_id).await?, promoted))
    }

    pub async fn stats(&self, low_stock_threshold: i32) -> AppResult<InventoryStats> {
        let (titles, total_copies, available_copies, low_stock_titles, out_of_stock_titles): (
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(total_quantity), 0)::bigint,
                   COALESCE(SUM(available_quantity), 0)::bigint,
                   COUNT(*) FILTER (WHERE status = 'active' AND available_quantity <= $1),
                   COUNT(*) FILTER (WHERE status = 'active' AND available_quantity = 0)
            FROM books
            "#,
        )
        .bind(low_stock_threshold)
        .fetch_one(&self.pool)
        .await?;

        let copies_by_category = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT COALESCE(category, 'Uncategorized') AS label, COALESCE(SUM(total_quantity), 0)::bigint AS value
            FROM books
            GROUP BY 1
            ORDER BY value DESC, label
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(InventoryStats {
            titles,
            total_copies,
            available_copies,
            borrowed_copies: total_copies - available_copies,
            low_stock_titles,
            out_of_stock_titles,
            copies_by_category,
        })
    }
}
