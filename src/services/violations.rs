//! Violation reports service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        violation::{CreateViolation, UpdateViolation, ViolationQuery, ViolationStats},
        Page, Violation, ViolationKind,
    },
    repository::Repository,
    rules,
};

#[derive(Clone)]
pub struct ViolationsService {
    repository: Repository,
}

impl ViolationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &ViolationQuery, page: Page) -> AppResult<(Vec<Violation>, i64)> {
        self.repository.violations.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Violation> {
        self.repository.violations.get_by_id(id).await
    }

    /// Report a violation by hand; the fine comes from the rate table and a
    /// pending fine receipt is issued with it
    pub async fn create(&self, data: &CreateViolation) -> AppResult<Violation> {
        if data.kind == ViolationKind::Late && data.days_late == 0 {
            return Err(AppError::Validation(
                "A late return needs at least one day late".to_string(),
            ));
        }

        let book_value = match data.book_id {
            Some(book_id) => self.repository.books.get_by_id(book_id).await?.price,
            None => None,
        };
        if let Some(ticket_id) = data.ticket_id {
            let ticket = self.repository.borrows.get_ticket(ticket_id).await?;
            if ticket.reader_id != data.reader_id {
                return Err(AppError::Validation(format!(
                    "Borrow ticket {} belongs to another reader",
                    ticket_id
                )));
            }
        }

        let fine = rules::fines::assess(data.kind, data.severity, data.days_late, book_value);
        let (violation, receipt_id) = self
            .repository
            .violations
            .create(data, &fine, Utc::now())
            .await?;

        tracing::info!(
            "Violation {} ({}) for reader {}: fine {} on receipt {}",
            violation.id,
            violation.kind,
            violation.reader_id,
            fine.total,
            receipt_id
        );
        Ok(violation)
    }

    pub async fn update(&self, id: i32, data: &UpdateViolation) -> AppResult<Violation> {
        self.repository
            .violations
            .update_description(id, data.description.as_deref())
            .await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.violations.delete(id).await
    }

    /// Close a violation without collecting its fine
    pub async fn process(&self, id: i32) -> AppResult<Violation> {
        self.repository.violations.process(id, Utc::now()).await
    }

    pub async fn stats(&self) -> AppResult<ViolationStats> {
        self.repository.violations.stats().await
    }
}
