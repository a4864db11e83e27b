//! Reservation (hold queue) service

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::AppResult,
    models::{
        reservation::{
            CreateReservation, ExpireResult, QueueEntry, ReservationQuery, ReservationStats,
            UpdateReservation,
        },
        BorrowDetails, Page, Reservation,
    },
    repository::{borrows::NewBorrow, Repository},
    rules,
};

use super::notifications::NotificationService;

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    notifications: NotificationService,
    library: LibraryConfig,
}

impl ReservationsService {
    pub fn new(repository: Repository, notifications: NotificationService, library: LibraryConfig) -> Self {
        Self {
            repository,
            notifications,
            library,
        }
    }

    pub async fn list(&self, query: &ReservationQuery, page: Page) -> AppResult<(Vec<Reservation>, i64)> {
        self.repository.reservations.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Reservation> {
        self.repository.reservations.get_by_id(id).await
    }

    /// Active reservations of a book with their queue positions
    pub async fn queue(&self, book_id: i32) -> AppResult<Vec<QueueEntry>> {
        self.repository.books.get_by_id(book_id).await?;
        let queue = self.repository.reservations.queue(book_id).await?;
        Ok(queue
            .into_iter()
            .enumerate()
            .map(|(i, reservation)| QueueEntry {
                position: i as i64 + 1,
                reservation,
            })
            .collect())
    }

    pub async fn create(&self, data: &CreateReservation) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.create(data, Utc::now()).await?;
        tracing::info!(
            "Reader {} queued for book {} (reservation {})",
            reservation.reader_id,
            reservation.book_id,
            reservation.id
        );
        Ok(reservation)
    }

    pub async fn update(&self, id: i32, data: &UpdateReservation) -> AppResult<Reservation> {
        self.repository
            .reservations
            .update_notes(id, data.notes.as_deref())
            .await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let promoted = self
            .repository
            .reservations
            .delete(id, self.library.hold_days, Utc::now())
            .await?;
        self.notifications.holds_ready(&promoted).await;
        Ok(())
    }

    pub async fn cancel(&self, id: i32) -> AppResult<Reservation> {
        let promoted = self
            .repository
            .reservations
            .cancel(id, self.library.hold_days, Utc::now())
            .await?;
        self.notifications.holds_ready(&promoted).await;
        self.repository.reservations.get_by_id(id).await
    }

    /// Turn a ready hold into a borrow ticket for its reader
    pub async fn fulfil(&self, id: i32, created_by: Option<i32>) -> AppResult<BorrowDetails> {
        let now = Utc::now();
        let reservation = self.repository.reservations.get_by_id(id).await?;
        rules::reservations::check_fulfillable(reservation.status, reservation.hold_expires_at, now)?;

        let book_ids = [reservation.book_id];
        let new = NewBorrow {
            reader_id: reservation.reader_id,
            book_ids: &book_ids,
            days: None,
            notes: reservation.notes.as_deref(),
            created_by,
        };
        let ticket_id = self.repository.borrows.create(&new, now).await?;

        tracing::info!("Reservation {} fulfilled by ticket {}", id, ticket_id);
        self.repository.borrows.get_details(ticket_id).await
    }

    /// Expire overdue holds and pass their copies down the queues
    pub async fn expire(&self) -> AppResult<ExpireResult> {
        let (expired, promoted) = self
            .repository
            .reservations
            .expire(self.library.hold_days, Utc::now())
            .await?;
        self.notifications.holds_ready(&promoted).await;

        tracing::info!("{} hold(s) expired, {} promoted", expired, promoted.len());
        Ok(ExpireResult {
            expired,
            promoted: self.repository.reservations.get_many(&promoted).await?,
        })
    }

    pub async fn stats(&self) -> AppResult<ReservationStats> {
        self.repository.reservations.stats().await
    }
}
