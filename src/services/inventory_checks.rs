//! Inventory check service

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::AppResult,
    models::{
        inventory::{
            CreateInventoryCheck, InventoryCheck, InventoryCheckDetails, InventoryCheckQuery,
            InventoryCheckStats, UpdateInventoryCheck,
        },
        Page,
    },
    repository::Repository,
    rules,
};

use super::notifications::NotificationService;

#[derive(Clone)]
pub struct InventoryChecksService {
    repository: Repository,
    notifications: NotificationService,
    library: LibraryConfig,
}

impl InventoryChecksService {
    pub fn new(repository: Repository, notifications: NotificationService, library: LibraryConfig) -> Self {
        Self {
            repository,
            notifications,
            library,
        }
    }

    pub async fn list(&self, query: &InventoryCheckQuery, page: Page) -> AppResult<(Vec<InventoryCheck>, i64)> {
        self.repository.inventory_checks.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<InventoryCheckDetails> {
        self.repository.inventory_checks.get_details(id).await
    }

    pub async fn create(
        &self,
        data: &CreateInventoryCheck,
        checked_by: Option<i32>,
    ) -> AppResult<InventoryCheckDetails> {
        rules::inventory::validate_count_lines(&data.lines)?;
        self.repository
            .inventory_checks
            .create(data, checked_by, Utc::now())
            .await
    }

    pub async fn update(&self, id: i32, data: &UpdateInventoryCheck) -> AppResult<InventoryCheckDetails> {
        rules::inventory::validate_count_lines(&data.lines)?;
        self.repository
            .inventory_checks
            .update(id, data, Utc::now())
            .await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.inventory_checks.delete(id).await
    }

    /// Apply the counted quantities to the catalog
    pub async fn complete(&self, id: i32) -> AppResult<InventoryCheckDetails> {
        let (details, promoted) = self
            .repository
            .inventory_checks
            .complete(id, self.library.hold_days, Utc::now())
            .await?;
        self.notifications.holds_ready(&promoted).await;
        Ok(details)
    }

    pub async fn stats(&self) -> AppResult<InventoryCheckStats> {
        self.repository.inventory_checks.stats().await
    }
}
