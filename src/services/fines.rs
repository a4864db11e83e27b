//! Fines: fine receipts and the rate table preview

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        receipt::{CreateReceipt, ReceiptQuery, ReceiptStats, UpdateReceipt},
        violation::{CreateFine, FineAssessment, FineListQuery, FineQuery},
        Page, Receipt, ReceiptKind, ViolationStatus,
    },
    repository::Repository,
    rules,
};

#[derive(Clone)]
pub struct FinesService {
    repository: Repository,
}

impl FinesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &FineListQuery, page: Page) -> AppResult<(Vec<Receipt>, i64)> {
        let query = ReceiptQuery {
            reader_id: query.reader_id,
            kind: Some(ReceiptKind::Fine),
            status: query.status,
            from: query.from,
            to: query.to,
            page: query.page,
            per_page: query.per_page,
        };
        self.repository.receipts.list(&query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Receipt> {
        let receipt = self.repository.receipts.get_by_id(id).await?;
        if receipt.kind != ReceiptKind::Fine {
            return Err(AppError::NotFound(format!("Fine with id {} not found", id)));
        }
        Ok(receipt)
    }

    /// Issue a new fine receipt for a violation, e.g. after a cancelled one
    pub async fn create(&self, data: &CreateFine) -> AppResult<Receipt> {
        let violation = self.repository.violations.get_by_id(data.violation_id).await?;
        if violation.status == ViolationStatus::Processed {
            return Err(AppError::rule(
                ErrorCode::AlreadyProcessed,
                format!("Violation {} is already processed", violation.id),
            ));
        }
        if self
            .repository
            .receipts
            .pending_for_violation(violation.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Violation {} already has a pending fine",
                violation.id
            )));
        }

        let amount = data.amount.unwrap_or(violation.fine_amount);
        check_amount(amount)?;

        let receipt = CreateReceipt {
            reader_id: Some(violation.reader_id),
            kind: ReceiptKind::Fine,
            amount,
            violation_id: Some(violation.id),
            membership_months: None,
            notes: data.notes.clone(),
        };
        self.repository.receipts.create(&receipt).await
    }

    pub async fn update(&self, id: i32, data: &UpdateReceipt) -> AppResult<Receipt> {
        self.get(id).await?;
        if let Some(amount) = data.amount {
            check_amount(amount)?;
        }
        self.repository.receipts.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.get(id).await?;
        self.repository.receipts.delete(id).await
    }

    /// Collect a fine; its violation is marked processed
    pub async fn pay(&self, id: i32, collected_by: i32) -> AppResult<Receipt> {
        self.get(id).await?;
        let receipt = self
            .repository
            .receipts
            .collect(id, collected_by, Utc::now())
            .await?;
        tracing::info!("Fine {} of {} paid", id, receipt.amount);
        Ok(receipt)
    }

    /// Preview the fine the rate table gives
    pub async fn calculate(&self, query: &FineQuery) -> AppResult<FineAssessment> {
        let days_late = query.days_late.unwrap_or(0);
        if days_late < 0 {
            return Err(AppError::Validation("days_late cannot be negative".to_string()));
        }
        let book_value = match (query.book_value, query.book_id) {
            (Some(value), _) => Some(value),
            (None, Some(book_id)) => self.repository.books.get_by_id(book_id).await?.price,
            (None, None) => None,
        };
        Ok(rules::fines::assess(query.kind, query.severity, days_late, book_value))
    }

    pub async fn stats(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> AppResult<ReceiptStats> {
        let (from, to) = rules::report_period(from, to, Utc::now().date_naive())?;
        self.repository
            .receipts
            .stats(from, to, Some(ReceiptKind::Fine))
            .await
    }
}

fn check_amount(amount: Decimal) -> AppResult<()> {
    if amount < Decimal::ZERO {
        return Err(AppError::Validation("Amount cannot be negative".to_string()));
    }
    Ok(())
}
