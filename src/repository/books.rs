//! Books repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use super::{like_pattern, reservations, where_clause};
use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        book::{Book, BookQuery, BookStats, CreateBook, UpdateBook},
        Page, StatEntry,
    },
    rules::inventory::Stock,
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search books with pagination
    pub async fn list(&self, query: &BookQuery, page: Page) -> AppResult<(Vec<Book>, i64)> {
        let search = like_pattern(&query.search);
        let title = like_pattern(&query.title);
        let author = like_pattern(&query.author);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if search.is_some() {
            conditions.push(format!(
                "(LOWER(title) LIKE ${0} OR LOWER(COALESCE(author, '')) LIKE ${0} OR COALESCE(isbn, '') LIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if title.is_some() {
            conditions.push(format!("LOWER(title) LIKE ${}", idx));
            idx += 1;
        }
        if author.is_some() {
            conditions.push(format!("LOWER(author) LIKE ${}", idx));
            idx += 1;
        }
        if query.category.is_some() {
            conditions.push(format!("LOWER(category) = LOWER(${})", idx));
            idx += 1;
        }
        if query.isbn.is_some() {
            conditions.push(format!("isbn = ${}", idx));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
        }
        if query.available_only == Some(true) {
            conditions.push("available_quantity > 0".to_string());
        }

        let where_clause = where_clause(&conditions);
        let isbn = query.isbn.as_ref().map(|i| i.replace(['-', ' '], ""));

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(ref v) = search { builder = builder.bind(v); }
                if let Some(ref v) = title { builder = builder.bind(v); }
                if let Some(ref v) = author { builder = builder.bind(v); }
                if let Some(ref v) = query.category { builder = builder.bind(v); }
                if let Some(ref v) = isbn { builder = builder.bind(v); }
                if let Some(v) = query.status { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM books {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "SELECT * FROM books {} ORDER BY title, id LIMIT {} OFFSET {}",
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, Book>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Check if an ISBN is already catalogued
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != COALESCE($2, 0))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a new book
    pub async fn create(&self, data: &CreateBook, isbn: Option<String>, stock: Stock) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author, category, isbn, publisher, publish_year,
                total_quantity, available_quantity, shelf_location, cover_image,
                price, description
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(data.title.trim())
        .bind(&data.author)
        .bind(&data.category)
        .bind(isbn)
        .bind(&data.publisher)
        .bind(data.publish_year)
        .bind(stock.total)
        .bind(stock.available)
        .bind(&data.shelf_location)
        .bind(&data.cover_image)
        .bind(data.price)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    /// Update a book. A new total shifts the shelf count by the same delta;
    /// freed copies go to waiting reservations.
    pub async fn update(
        &self,
        id: i32,
        data: &UpdateBook,
        isbn: Option<String>,
        hold_days: i64,
    ) -> AppResult<(Book, Vec<i32>)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let current = lock(&mut tx, id).await?;
        let stock = match data.total_quantity {
            Some(total) => Stock::new(current.total_quantity, current.available_quantity).retotal(total)?,
            None => Stock::new(current.total_quantity, current.available_quantity),
        };

        let mut sets = vec![
            "updated_at = $1".to_string(),
            "total_quantity = $2".to_string(),
            "available_quantity = $3".to_string(),
        ];
        let mut idx = 4;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.title, "title");
        add_field!(data.author, "author");
        add_field!(data.category, "category");
        add_field!(isbn, "isbn");
        add_field!(data.publisher, "publisher");
        add_field!(data.publish_year, "publish_year");
        add_field!(data.shelf_location, "shelf_location");
        add_field!(data.status, "status");
        add_field!(data.cover_image, "cover_image");
        add_field!(data.price, "price");
        add_field!(data.description, "description");

        let query = format!("UPDATE books SET {} WHERE id = {} RETURNING *", sets.join(", "), id);

        let mut builder = sqlx::query_as::<_, Book>(&query)
            .bind(now)
            .bind(stock.total)
            .bind(stock.available);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.title);
        bind_field!(data.author);
        bind_field!(data.category);
        bind_field!(isbn);
        bind_field!(data.publisher);
        bind_field!(data.publish_year);
        bind_field!(data.shelf_location);
        bind_field!(data.status);
        bind_field!(data.cover_image);
        bind_field!(data.price);
        bind_field!(data.description);

        let book = builder.fetch_one(&mut *tx).await?;

        let promoted = if stock.available > current.available_quantity {
            reservations::promote(&mut tx, id, hold_days, now).await?
        } else {
            Vec::new()
        };

        tx.commit().await?;
        Ok((book, promoted))
    }

    /// Delete a book with no copies out and no circulation or stock history
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let book = self.get_by_id(id).await?;

        let on_loan: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_lines WHERE book_id = $1 AND returned_at IS NULL",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if on_loan > 0 {
            return Err(AppError::rule(
                ErrorCode::BooksOnLoan,
                format!("'{}' has {} copies on loan", book.title, on_loan),
            ));
        }

        let has_history: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM borrow_lines WHERE book_id = $1)
                OR EXISTS(SELECT 1 FROM stock_in_lines WHERE book_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if has_history {
            return Err(AppError::Conflict(format!(
                "'{}' has borrow or stock-in history; withdraw it instead",
                book.title
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Distinct categories with their title counts
    pub async fn categories(&self) -> AppResult<Vec<StatEntry>> {
        let rows = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT category AS label, COUNT(*)::bigint AS value
            FROM books
            WHERE category IS NOT NULL AND category != ''
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn stats(&self) -> AppResult<BookStats> {
        let (total_titles, withdrawn_titles, total_copies, available_copies): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*)::bigint,
                       COUNT(*) FILTER (WHERE status = 'withdrawn')::bigint,
                       COALESCE(SUM(total_quantity), 0)::bigint,
                       COALESCE(SUM(available_quantity), 0)::bigint
                FROM books
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        let by_category = sqlx::query_as::<_, StatEntry>(
            r#"
            SELECT COALESCE(NULLIF(category, ''), 'uncategorized') AS label,
                   COALESCE(SUM(total_quantity), 0)::bigint AS value
            FROM books
            GROUP BY 1
            ORDER BY value DESC, label
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(BookStats {
            total_titles,
            withdrawn_titles,
            total_copies,
            available_copies,
            borrowed_copies: total_copies - available_copies,
            by_category,
        })
    }
}

/// Lock a book row for the rest of the transaction
pub(crate) async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<Book> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
}

/// Write new quantities of a locked book
pub(crate) async fn save_stock(
    conn: &mut PgConnection,
    id: i32,
    stock: Stock,
    now: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE books SET total_quantity = $2, available_quantity = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(id)
    .bind(stock.total)
    .bind(stock.available)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Copies of a book set aside for ready reservations of other readers
pub(crate) async fn held_for_others(
    conn: &mut PgConnection,
    book_id: i32,
    reader_id: i32,
) -> AppResult<i64> {
    let held: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM reservations
        WHERE book_id = $1 AND reader_id != $2 AND status = 'ready_for_pickup'
        "#,
    )
    .bind(book_id)
    .bind(reader_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(held)
}
