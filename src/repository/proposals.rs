//! Purchase proposals repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use super::{like_pattern, where_clause};
use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        proposal::{CreateProposal, ProposalQuery, ProposalStats, PurchaseProposal, UpdateProposal},
        Page, ProposalStatus, StatEntry,
    },
};

#[derive(Clone)]
pub struct ProposalsRepository {
    pool: Pool<Postgres>,
}

impl ProposalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        query: &ProposalQuery,
        page: Page,
    ) -> AppResult<(Vec<PurchaseProposal>, i64)> {
        let search = like_pattern(&query.search);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if query.proposed_by.is_some() {
            conditions.push(format!("proposed_by = ${}", idx));
            idx += 1;
        }
        if search.is_some() {
            conditions.push(format!(
                "(LOWER(title) LIKE ${0} OR LOWER(COALESCE(author, '')) LIKE ${0})",
                idx
            ));
        }

        let where_clause = where_clause(&conditions);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(v) = query.status { builder = builder.bind(v); }
                if let Some(v) = query.proposed_by { builder = builder.bind(v); }
                if let Some(ref v) = search { builder = builder.bind(v); }
                builder
            }};
        }

        let count_q = format!("SELECT COUNT(*) FROM purchase_proposals {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_q))
            .fetch_one(&self.pool)
            .await?;

        let select_q = format!(
            "SELECT * FROM purchase_proposals {} ORDER BY created_at DESC, id DESC LIMIT {} OFFSET {}",
            where_clause,
            page.per_page,
            page.offset()
        );
        let rows = bind_filters!(sqlx::query_as::<_, PurchaseProposal>(&select_q))
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<PurchaseProposal> {
        sqlx::query_as::<_, PurchaseProposal>("SELECT * FROM purchase_proposals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Proposal with id {} not found", id)))
    }

    pub async fn create(
        &self,
        data: &CreateProposal,
        isbn: Option<String>,
        proposed_by: Option<i32>,
    ) -> AppResult<PurchaseProposal> {
        let row = sqlx::query_as::<_, PurchaseProposal>(
            r#"
            INSERT INTO purchase_proposals (title, author, publisher, isbn, quantity, estimated_price, reason, proposed_by, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(data.title.trim())
        .bind(&data.author)
        .bind(&data.publisher)
        .bind(isbn)
        .bind(data.quantity)
        .bind(data.estimated_price)
        .bind(&data.reason)
        .bind(proposed_by)
        .bind(ProposalStatus::Pending)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Edit a proposal that has not been reviewed yet
    pub async fn update(
        &self,
        id: i32,
        data: &UpdateProposal,
        isbn: Option<String>,
    ) -> AppResult<PurchaseProposal> {
        let mut tx = self.pool.begin().await?;
        lock_pending(&mut tx, id).await?;

        let mut sets = vec!["updated_at = NOW()".to_string()];
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.title, "title");
        add_field!(data.author, "author");
        add_field!(data.publisher, "publisher");
        add_field!(isbn, "isbn");
        add_field!(data.quantity, "quantity");
        add_field!(data.estimated_price, "estimated_price");
        add_field!(data.reason, "reason");

        let query = format!(
            "UPDATE purchase_proposals SET {} WHERE id = {} RETURNING *",
            sets.join(", "),
            id
        );

        let mut builder = sqlx::query_as::<_, PurchaseProposal>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.title);
        bind_field!(data.author);
        bind_field!(data.publisher);
        bind_field!(isbn);
        bind_field!(data.quantity);
        bind_field!(data.estimated_price);
        bind_field!(data.reason);

        let proposal = builder.fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(proposal)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_pending(&mut tx, id).await?;

        sqlx::query("DELETE FROM purchase_proposals WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Approve or reject a pending proposal
    pub async fn review(
        &self,
        id: i32,
        decision: ProposalStatus,
        reviewed_by: i32,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<PurchaseProposal> {
        if decision == ProposalStatus::Pending {
            return Err(AppError::Validation("A review must approve or reject".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        lock_pending(&mut tx, id).await?;

        let proposal = sqlx::query_as::<_, PurchaseProposal>(
            r#"
            UPDATE purchase_proposals
            SET status = $2, reviewed_by = $3, reviewed_at = $4, review_note = $5, updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(decision)
        .bind(reviewed_by)
        .bind(now)
        .bind(note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("Proposal {} {} by user {}", id, decision, reviewed_by);
        Ok(proposal)
    }

    pub async fn stats(&self) -> AppResult<ProposalStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_proposals")
            .fetch_one(&self.pool)
            .await?;

        let by_status = sqlx::query_as::<_, StatEntry>(
            "SELECT status AS label, COUNT(*)::bigint AS value FROM purchase_proposals GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;

        let approved_budget: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity * COALESCE(estimated_price, 0)), 0)
            FROM purchase_proposals
            WHERE status = 'approved'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ProposalStats {
            total,
            by_status,
            approved_budget,
        })
    }
}

async fn lock_pending(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let status: ProposalStatus =
        sqlx::query_scalar("SELECT status FROM purchase_proposals WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Proposal with id {} not found", id)))?;
    if status != ProposalStatus::Pending {
        return Err(AppError::rule(
            ErrorCode::AlreadyProcessed,
            format!("Proposal {} is already {}", id, status),
        ));
    }
    Ok(())
}
