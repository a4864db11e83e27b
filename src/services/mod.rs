//! Business logic services

pub mod books;
pub mod borrows;
pub mod fines;
pub mod inventory;
pub mod inventory_checks;
pub mod notifications;
pub mod proposals;
pub mod readers;
pub mod receipts;
pub mod reports;
pub mod reservations;
pub mod stock_ins;
pub mod users;
pub mod violations;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub readers: readers::ReadersService,
    pub users: users::UsersService,
    pub borrows: borrows::BorrowsService,
    pub reservations: reservations::ReservationsService,
    pub violations: violations::ViolationsService,
    pub fines: fines::FinesService,
    pub receipts: receipts::ReceiptsService,
    pub inventory: inventory::InventoryService,
    pub stock_ins: stock_ins::StockInsService,
    pub inventory_checks: inventory_checks::InventoryChecksService,
    pub proposals: proposals::ProposalsService,
    pub reports: reports::ReportsService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let library = config.library.clone();
        let notifications = notifications::NotificationService::new(repository.clone(), &config.email);

        Self {
            books: books::BooksService::new(repository.clone(), notifications.clone(), library.clone()),
            readers: readers::ReadersService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            borrows: borrows::BorrowsService::new(repository.clone(), notifications.clone(), library.clone()),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                notifications.clone(),
                library.clone(),
            ),
            violations: violations::ViolationsService::new(repository.clone()),
            fines: fines::FinesService::new(repository.clone()),
            receipts: receipts::ReceiptsService::new(repository.clone()),
            inventory: inventory::InventoryService::new(repository.clone(), notifications.clone(), library.clone()),
            stock_ins: stock_ins::StockInsService::new(repository.clone(), notifications.clone(), library.clone()),
            inventory_checks: inventory_checks::InventoryChecksService::new(
                repository.clone(),
                notifications,
                library.clone(),
            ),
            proposals: proposals::ProposalsService::new(repository.clone()),
            reports: reports::ReportsService::new(repository.clone(), library),
            repository,
        }
    }
}
