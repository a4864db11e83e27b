//! Period reports

use chrono::Utc;

use crate::{
    config::LibraryConfig,
    error::AppResult,
    models::report::{BorrowingReport, InventoryReport, ReportQuery, RevenueReport},
    repository::Repository,
    rules,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    library: LibraryConfig,
}

impl ReportsService {
    pub fn new(repository: Repository, library: LibraryConfig) -> Self {
        Self { repository, library }
    }

    pub async fn borrowing(&self, query: &ReportQuery) -> AppResult<BorrowingReport> {
        let now = Utc::now();
        let (from, to) = rules::report_period(query.from, query.to, now.date_naive())?;
        self.repository
            .reports
            .borrowing(from, to, rules::top_limit(query.limit), now)
            .await
    }

    pub async fn revenue(&self, query: &ReportQuery) -> AppResult<RevenueReport> {
        let (from, to) = rules::report_period(query.from, query.to, Utc::now().date_naive())?;
        self.repository.reports.revenue(from, to).await
    }

    pub async fn inventory(&self, query: &ReportQuery) -> AppResult<InventoryReport> {
        let (from, to) = rules::report_period(query.from, query.to, Utc::now().date_naive())?;
        self.repository
            .reports
            .inventory(
                from,
                to,
                self.library.low_stock_threshold,
                rules::top_limit(query.limit),
            )
            .await
    }
}
