//! Book catalog service

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookStats, CreateBook, UpdateBook},
        Page, StatEntry,
    },
    repository::Repository,
    rules,
};

use super::notifications::NotificationService;

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    notifications: NotificationService,
    library: LibraryConfig,
}

impl BooksService {
    pub fn new(repository: Repository, notifications: NotificationService, library: LibraryConfig) -> Self {
        Self {
            repository,
            notifications,
            library,
        }
    }

    pub async fn list(&self, query: &BookQuery, page: Page) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let isbn = self.checked_isbn(data.isbn.as_deref(), None).await?;
        let stock = rules::inventory::initial_stock(data.total_quantity, data.available_quantity)?;

        let book = self.repository.books.create(data, isbn, stock).await?;
        tracing::info!("Book {} created: {}", book.id, book.title);
        Ok(book)
    }

    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let isbn = self.checked_isbn(data.isbn.as_deref(), Some(id)).await?;
        let (book, promoted) = self
            .repository
            .books
            .update(id, data, isbn, self.library.hold_days)
            .await?;
        self.notifications.holds_ready(&promoted).await;
        Ok(book)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    pub async fn categories(&self) -> AppResult<Vec<StatEntry>> {
        self.repository.books.categories().await
    }

    pub async fn stats(&self) -> AppResult<BookStats> {
        self.repository.books.stats().await
    }

    /// Normalized ISBN, rejecting one already used by another book
    async fn checked_isbn(&self, raw: Option<&str>, exclude_id: Option<i32>) -> AppResult<Option<String>> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let Some(isbn) = rules::catalog::normalize_isbn(raw)? else {
            return Ok(None);
        };
        if self.repository.books.isbn_exists(&isbn, exclude_id).await? {
            return Err(AppError::Conflict(format!("A book with ISBN {} already exists", isbn)));
        }
        Ok(Some(isbn))
    }
}
