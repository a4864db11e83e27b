//! Revenue receipts service

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{
        receipt::{CreateReceipt, ReceiptQuery, ReceiptStats, UpdateReceipt},
        Page, Receipt, ReceiptKind,
    },
    repository::Repository,
    rules,
};

#[derive(Clone)]
pub struct ReceiptsService {
    repository: Repository,
}

impl ReceiptsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &ReceiptQuery, page: Page) -> AppResult<(Vec<Receipt>, i64)> {
        self.repository.receipts.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Receipt> {
        self.repository.receipts.get_by_id(id).await
    }

    /// Issue a receipt by hand
    pub async fn create(&self, data: &CreateReceipt) -> AppResult<Receipt> {
        if data.amount < Decimal::ZERO {
            return Err(AppError::Validation("Amount cannot be negative".to_string()));
        }

        match data.kind {
            ReceiptKind::MembershipFee => {
                let reader_id = data.reader_id.ok_or_else(|| {
                    AppError::Validation("A membership fee needs a reader".to_string())
                })?;
                self.repository.readers.get_by_id(reader_id).await?;
                if data.violation_id.is_some() {
                    return Err(AppError::Validation(
                        "A membership fee cannot reference a violation".to_string(),
                    ));
                }
                let receipt = CreateReceipt {
                    reader_id: Some(reader_id),
                    kind: data.kind,
                    amount: data.amount,
                    violation_id: None,
                    membership_months: Some(data.membership_months.unwrap_or(1)),
                    notes: data.notes.clone(),
                };
                self.repository.receipts.create(&receipt).await
            }
            ReceiptKind::Fine => {
                let violation_id = data.violation_id.ok_or_else(|| {
                    AppError::Validation("A fine needs a violation".to_string())
                })?;
                let violation = self.repository.violations.get_by_id(violation_id).await?;
                if data.reader_id.is_some_and(|id| id != violation.reader_id) {
                    return Err(AppError::Validation(format!(
                        "Violation {} belongs to another reader",
                        violation_id
                    )));
                }
                let receipt = CreateReceipt {
                    reader_id: Some(violation.reader_id),
                    kind: data.kind,
                    amount: data.amount,
                    violation_id: Some(violation_id),
                    membership_months: None,
                    notes: data.notes.clone(),
                };
                self.repository.receipts.create(&receipt).await
            }
        }
    }

    pub async fn update(&self, id: i32, data: &UpdateReceipt) -> AppResult<Receipt> {
        if data.amount.is_some_and(|a| a < Decimal::ZERO) {
            return Err(AppError::Validation("Amount cannot be negative".to_string()));
        }
        self.repository.receipts.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.receipts.delete(id).await
    }

    pub async fn collect(&self, id: i32, collected_by: i32) -> AppResult<Receipt> {
        let receipt = self
            .repository
            .receipts
            .collect(id, collected_by, Utc::now())
            .await?;
        tracing::info!("Receipt {} ({}) collected: {}", id, receipt.kind, receipt.amount);
        Ok(receipt)
    }

    pub async fn cancel(&self, id: i32) -> AppResult<Receipt> {
        self.repository.receipts.cancel(id).await
    }

    pub async fn stats(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> AppResult<ReceiptStats> {
        let (from, to) = rules::report_period(from, to, Utc::now().date_naive())?;
        self.repository.receipts.stats(from, to, None).await
    }
}
