//! Circulation service: borrow, return, renew

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::AppResult,
    models::{
        borrow::{BorrowQuery, BorrowStats, BorrowSummary, CreateBorrow, ReturnBorrow, ReturnResult, UpdateBorrow},
        BorrowDetails, Page,
    },
    repository::{borrows::NewBorrow, Repository},
    rules,
};

use super::notifications::NotificationService;

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    notifications: NotificationService,
    library: LibraryConfig,
}

impl BorrowsService {
    pub fn new(repository: Repository, notifications: NotificationService, library: LibraryConfig) -> Self {
        Self {
            repository,
            notifications,
            library,
        }
    }

    pub async fn list(&self, query: &BorrowQuery, page: Page) -> AppResult<(Vec<BorrowSummary>, i64)> {
        self.repository.borrows.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<BorrowDetails> {
        self.repository.borrows.get_details(id).await
    }

    /// Lend one copy of each requested book to a reader
    pub async fn create(&self, data: &CreateBorrow, created_by: Option<i32>) -> AppResult<BorrowDetails> {
        rules::borrowing::validate_book_ids(&data.book_ids)?;

        let new = NewBorrow {
            reader_id: data.reader_id,
            book_ids: &data.book_ids,
            days: data.days,
            notes: data.notes.as_deref(),
            created_by,
        };
        let id = self.repository.borrows.create(&new, Utc::now()).await?;

        tracing::info!(
            "Ticket {} opened for reader {} with {} book(s)",
            id,
            data.reader_id,
            data.book_ids.len()
        );
        self.repository.borrows.get_details(id).await
    }

    pub async fn update(&self, id: i32, data: &UpdateBorrow) -> AppResult<BorrowDetails> {
        self.repository.borrows.update(id, data, Utc::now()).await?;
        self.repository.borrows.get_details(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.borrows.delete(id).await
    }

    /// Take books back, raising fines and serving the reservation queues
    pub async fn return_books(&self, id: i32, request: &ReturnBorrow) -> AppResult<ReturnResult> {
        let outcome = self
            .repository
            .borrows
            .return_books(id, &request.lines, self.library.hold_days, Utc::now())
            .await?;

        self.notifications.holds_ready(&outcome.promoted).await;

        let borrow = self.repository.borrows.get_details(id).await?;
        let ready_reservations = self.repository.reservations.get_many(&outcome.promoted).await?;

        Ok(ReturnResult {
            borrow,
            days_late: outcome.days_late,
            fine_receipt_ids: outcome.fine_receipt_ids,
            total_fine: outcome.total_fine,
            ready_reservations,
        })
    }

    pub async fn renew(&self, id: i32) -> AppResult<BorrowDetails> {
        self.repository.borrows.renew(id, Utc::now()).await?;
        let details = self.repository.borrows.get_details(id).await?;
        tracing::info!(
            "Ticket {} renewed ({}), due {}",
            id,
            details.ticket.renew_count,
            details.ticket.due_date
        );
        Ok(details)
    }

    pub async fn mark_overdue(&self) -> AppResult<u64> {
        let marked = self.repository.borrows.mark_overdue(Utc::now()).await?;
        tracing::info!("{} ticket(s) marked overdue", marked);
        Ok(marked)
    }

    pub async fn stats(&self) -> AppResult<BorrowStats> {
        let now = Utc::now();
        self.repository.borrows.stats(now.date_naive(), now).await
    }
}
