//! API handlers for the Thư viện REST endpoints

pub mod books;
pub mod borrows;
pub mod fines;
pub mod health;
pub mod inventory;
pub mod inventory_checks;
pub mod openapi;
pub mod proposals;
pub mod readers;
pub mod receipts;
pub mod reports;
pub mod reservations;
pub mod stock_ins;
pub mod users;
pub mod violations;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{user::UserClaims, Page, Role},
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

/// Count of rows touched by a maintenance sweep
#[derive(Serialize, ToSchema)]
pub struct SweepResponse {
    pub updated: u64,
}

/// Reader-role callers are pinned to their own reader id; staff keep the
/// requested filter
pub(crate) fn reader_scope(claims: &UserClaims, requested: Option<i32>) -> Result<Option<i32>, AppError> {
    if claims.role != Role::Reader {
        return Ok(requested);
    }
    let own = claims
        .reader_id
        .ok_or_else(|| AppError::Authorization("Account is not linked to a reader".to_string()))?;
    match requested {
        Some(id) if id != own => Err(AppError::Authorization(
            "Readers can only access their own records".to_string(),
        )),
        _ => Ok(Some(own)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims(role: Role, reader_id: Option<i32>) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "tester".to_string(),
            user_id: 1,
            role,
            reader_id,
            exp: now + 60,
            iat: now,
        }
    }

    #[test]
    fn staff_keep_their_filter() {
        let librarian = claims(Role::Librarian, None);
        assert_eq!(reader_scope(&librarian, None).unwrap(), None);
        assert_eq!(reader_scope(&librarian, Some(4)).unwrap(), Some(4));
    }

    #[test]
    fn readers_are_pinned_to_themselves() {
        let reader = claims(Role::Reader, Some(4));
        assert_eq!(reader_scope(&reader, None).unwrap(), Some(4));
        assert_eq!(reader_scope(&reader, Some(4)).unwrap(), Some(4));
        assert!(reader_scope(&reader, Some(5)).is_err());
        assert!(reader_scope(&claims(Role::Reader, None), None).is_err());
    }

    #[test]
    fn pagination_echoes_the_window() {
        let response = PaginatedResponse::<crate::models::StatEntry>::new(Vec::new(), 42, Page::new(Some(2), Some(10)));
        assert_eq!(response.total, 42);
        assert_eq!(response.page, 2);
        assert_eq!(response.per_page, 10);
    }
}
