//! Stock-in service

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::AppResult,
    models::{
        stock_in::{CreateStockIn, StockIn, StockInDetails, StockInQuery, StockInStats, UpdateStockIn},
        Page,
    },
    repository::Repository,
    rules,
};

use super::notifications::NotificationService;

#[derive(Clone)]
pub struct StockInsService {
    repository: Repository,
    notifications: NotificationService,
    library: LibraryConfig,
}

impl StockInsService {
    pub fn new(repository: Repository, notifications: NotificationService, library: LibraryConfig) -> Self {
        Self {
            repository,
            notifications,
            library,
        }
    }

    pub async fn list(&self, query: &StockInQuery, page: Page) -> AppResult<(Vec<StockIn>, i64)> {
        self.repository.stock_ins.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<StockInDetails> {
        self.repository.stock_ins.get_details(id).await
    }

    pub async fn create(&self, data: &CreateStockIn, created_by: Option<i32>) -> AppResult<StockInDetails> {
        let total = rules::inventory::stock_in_total(&data.lines)?;
        let (details, promoted) = self
            .repository
            .stock_ins
            .create(data, total, created_by, self.library.hold_days, Utc::now())
            .await?;
        self.notifications.holds_ready(&promoted).await;
        Ok(details)
    }

    pub async fn update(&self, id: i32, data: &UpdateStockIn) -> AppResult<StockInDetails> {
        self.repository.stock_ins.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.stock_ins.delete(id, Utc::now()).await?;
        tracing::info!("Stock-in {} reversed", id);
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<StockInStats> {
        self.repository.stock_ins.stats().await
    }
}
