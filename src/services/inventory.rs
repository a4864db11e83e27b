//! Stock overview and manual adjustments

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{
        inventory::{InventoryStats, StockAdjustment, StockLevel, StockQuery},
        Page,
    },
    repository::Repository,
};

use super::notifications::NotificationService;

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
    notifications: NotificationService,
    library: LibraryConfig,
}

impl InventoryService {
    pub fn new(repository: Repository, notifications: NotificationService, library: LibraryConfig) -> Self {
        Self {
            repository,
            notifications,
            library,
        }
    }

    pub async fn list(&self, query: &StockQuery, page: Page) -> AppResult<(Vec<StockLevel>, i64)> {
        self.repository.inventory.levels(query, None, page).await
    }

    pub async fn get(&self, book_id: i32) -> AppResult<StockLevel> {
        self.repository.inventory.get(book_id).await
    }

    /// Titles at or below the low stock threshold
    pub async fn low_stock(&self, query: &StockQuery, page: Page) -> AppResult<(Vec<StockLevel>, i64)> {
        let threshold = query.threshold.unwrap_or(self.library.low_stock_threshold);
        if threshold < 0 {
            return Err(AppError::Validation("Threshold cannot be negative".to_string()));
        }
        self.repository.inventory.levels(query, Some(threshold), page).await
    }

    pub async fn adjust(&self, book_id: i32, data: &StockAdjustment) -> AppResult<StockLevel> {
        if data.delta == 0 {
            return Err(AppError::Validation("Adjustment cannot be zero".to_string()));
        }
        let (level, promoted) = self
            .repository
            .inventory
            .adjust(book_id, data.delta, data.reason.trim(), self.library.hold_days, Utc::now())
            .await?;
        self.notifications.holds_ready(&promoted).await;
        Ok(level)
    }

    pub async fn stats(&self) -> AppResult<InventoryStats> {
        self.repository
            .inventory
            .stats(self.library.low_stock_threshold)
            .await
    }
}
