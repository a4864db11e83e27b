//! Reader and membership service

use chrono::Utc;

use crate::{
    error::AppResult,
    models::{
        reader::{BorrowLimits, CreateReader, MembershipRequest, ReaderQuery, ReaderStats, UpdateReader},
        violation::ReaderFines,
        MembershipTier, Page, Reader, Receipt,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReadersService {
    repository: Repository,
}

impl ReadersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &ReaderQuery, page: Page) -> AppResult<(Vec<Reader>, i64)> {
        self.repository.readers.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Reader> {
        self.repository.readers.get_by_id(id).await
    }

    /// Register a reader; limits not given come from the tier
    pub async fn create(&self, data: &CreateReader) -> AppResult<Reader> {
        let tier = data.membership_tier.unwrap_or(MembershipTier::Standard);
        let limits = limits_for(tier, data.max_books, data.max_borrow_days, data.max_renewals);

        let reader = self.repository.readers.create(data, tier, limits).await?;
        tracing::info!("Reader {} registered ({})", reader.id, tier);
        Ok(reader)
    }

    pub async fn update(&self, id: i32, data: &UpdateReader) -> AppResult<Reader> {
        self.repository.readers.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.readers.delete(id).await
    }

    /// Issue a membership fee receipt for the requested months
    pub async fn request_membership(&self, id: i32, request: &MembershipRequest) -> AppResult<Receipt> {
        self.repository
            .readers
            .request_membership(id, request.membership_tier, request.months, Utc::now().date_naive())
            .await
    }

    pub async fn lock(&self, id: i32) -> AppResult<Reader> {
        let reader = self
            .repository
            .readers
            .set_locked(id, true, Utc::now().date_naive())
            .await?;
        tracing::info!("Reader {} locked", id);
        Ok(reader)
    }

    pub async fn unlock(&self, id: i32) -> AppResult<Reader> {
        self.repository
            .readers
            .set_locked(id, false, Utc::now().date_naive())
            .await
    }

    /// Mark paid memberships past their expiry date as expired
    pub async fn expire_memberships(&self) -> AppResult<u64> {
        let expired = self
            .repository
            .readers
            .expire_memberships(Utc::now().date_naive())
            .await?;
        tracing::info!("{} membership(s) expired", expired);
        Ok(expired)
    }

    /// Fine totals and violation history of one reader
    pub async fn fines(&self, id: i32) -> AppResult<ReaderFines> {
        self.repository.readers.get_by_id(id).await?;
        let (outstanding, paid) = self.repository.violations.fine_totals(id).await?;
        let violations = self.repository.violations.for_reader(id).await?;
        Ok(ReaderFines {
            reader_id: id,
            outstanding,
            paid,
            violations,
        })
    }

    pub async fn stats(&self) -> AppResult<ReaderStats> {
        self.repository.readers.stats(Utc::now().date_naive()).await
    }
}

fn limits_for(
    tier: MembershipTier,
    max_books: Option<i32>,
    max_borrow_days: Option<i32>,
    max_renewals: Option<i32>,
) -> BorrowLimits {
    let defaults = tier.default_limits();
    BorrowLimits {
        max_books: max_books.unwrap_or(defaults.max_books),
        max_borrow_days: max_borrow_days.unwrap_or(defaults.max_borrow_days),
        max_renewals: max_renewals.unwrap_or(defaults.max_renewals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_defaults_fill_missing_limits() {
        let limits = limits_for(MembershipTier::Student, None, Some(7), None);
        assert_eq!(limits.max_books, 5);
        assert_eq!(limits.max_borrow_days, 7);
        assert_eq!(limits.max_renewals, 2);
    }

    #[test]
    fn explicit_limits_win() {
        let limits = limits_for(MembershipTier::Vip, Some(1), Some(1), Some(0));
        assert_eq!(
            limits,
            BorrowLimits {
                max_books: 1,
                max_borrow_days: 1,
                max_renewals: 0
            }
        );
    }
}
