//! Purchase proposal service

use chrono::Utc;

use crate::{
    error::AppResult,
    models::{
        proposal::{CreateProposal, ProposalQuery, ProposalStats, PurchaseProposal, ReviewProposal, UpdateProposal},
        Page, ProposalStatus,
    },
    repository::Repository,
    rules,
};

#[derive(Clone)]
pub struct ProposalsService {
    repository: Repository,
}

impl ProposalsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &ProposalQuery, page: Page) -> AppResult<(Vec<PurchaseProposal>, i64)> {
        self.repository.proposals.list(query, page).await
    }

    pub async fn get(&self, id: i32) -> AppResult<PurchaseProposal> {
        self.repository.proposals.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateProposal, proposed_by: Option<i32>) -> AppResult<PurchaseProposal> {
        let isbn = normalized_isbn(data.isbn.as_deref())?;
        self.repository.proposals.create(data, isbn, proposed_by).await
    }

    pub async fn update(&self, id: i32, data: &UpdateProposal) -> AppResult<PurchaseProposal> {
        let isbn = normalized_isbn(data.isbn.as_deref())?;
        self.repository.proposals.update(id, data, isbn).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.proposals.delete(id).await
    }

    pub async fn approve(&self, id: i32, reviewed_by: i32, review: &ReviewProposal) -> AppResult<PurchaseProposal> {
        self.repository
            .proposals
            .review(id, ProposalStatus::Approved, reviewed_by, review.note.as_deref(), Utc::now())
            .await
    }

    pub async fn reject(&self, id: i32, reviewed_by: i32, review: &ReviewProposal) -> AppResult<PurchaseProposal> {
        self.repository
            .proposals
            .review(id, ProposalStatus::Rejected, reviewed_by, review.note.as_deref(), Utc::now())
            .await
    }

    pub async fn stats(&self) -> AppResult<ProposalStats> {
        self.repository.proposals.stats().await
    }
}

fn normalized_isbn(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw {
        Some(raw) => rules::catalog::normalize_isbn(raw),
        None => Ok(None),
    }
}
