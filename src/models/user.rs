//! User account model, access-token claims and role guards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{enums::Role, StatEntry};
use crate::error::AppError;

/// Staff or reader account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    /// Linked reader profile (required for the reader role)
    pub reader_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Matches username, display name or email
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters"))]
    pub username: String,
    pub display_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Role,
    pub reader_id: Option<i32>,
}

/// Update user request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters"))]
    pub username: Option<String>,
    pub display_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub reader_id: Option<i32>,
    pub is_active: Option<bool>,
}

/// User statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub by_role: Vec<StatEntry>,
}

/// JWT claims for authenticated callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    /// Reader profile of a reader-role caller
    pub reader_id: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a signed JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and validate a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.role != Role::Reader
    }

    /// Admin passes every role check
    fn require_any(&self, roles: &[Role], what: &str) -> Result<(), AppError> {
        if self.is_admin() || roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!("Insufficient rights to {}", what)))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff privileges required".to_string()))
        }
    }

    /// Catalog, readers and circulation
    pub fn require_librarian(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Librarian], "manage circulation")
    }

    /// Receipts and fines
    pub fn require_accountant(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Accountant], "manage receipts")
    }

    /// Stock-in, inventory checks and stock adjustments
    pub fn require_warehouse(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Warehouse], "manage inventory")
    }

    /// Violations are visible to librarians and accountants
    pub fn require_librarian_or_accountant(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Librarian, Role::Accountant], "read violations")
    }

    /// Staff reports
    pub fn require_reporting(&self) -> Result<(), AppError> {
        self.require_any(
            &[Role::Librarian, Role::Accountant, Role::Warehouse],
            "read reports",
        )
    }

    /// Readers may only touch their own records; librarians any
    pub fn require_reader_access(&self, reader_id: i32) -> Result<(), AppError> {
        if self.role == Role::Reader {
            if self.reader_id == Some(reader_id) {
                Ok(())
            } else {
                Err(AppError::Authorization("Readers can only access their own records".to_string()))
            }
        } else {
            self.require_librarian()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role, reader_id: Option<i32>) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "tester".to_string(),
            user_id: 7,
            role,
            reader_id,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn token_round_trip() {
        let original = claims(Role::Librarian, None);
        let token = original.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.role, Role::Librarian);
        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut expired = claims(Role::Admin, None);
        expired.exp = Utc::now().timestamp() - 3600;
        let token = expired.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn admin_passes_every_guard() {
        let admin = claims(Role::Admin, None);
        assert!(admin.require_librarian().is_ok());
        assert!(admin.require_accountant().is_ok());
        assert!(admin.require_warehouse().is_ok());
        assert!(admin.require_reader_access(42).is_ok());
    }

    #[test]
    fn roles_are_scoped() {
        let accountant = claims(Role::Accountant, None);
        assert!(accountant.require_accountant().is_ok());
        assert!(accountant.require_librarian().is_err());
        assert!(accountant.require_librarian_or_accountant().is_ok());

        let warehouse = claims(Role::Warehouse, None);
        assert!(warehouse.require_warehouse().is_ok());
        assert!(warehouse.require_accountant().is_err());
        assert!(warehouse.require_reporting().is_ok());
    }

    #[test]
    fn readers_only_see_themselves() {
        let reader = claims(Role::Reader, Some(5));
        assert!(reader.require_reader_access(5).is_ok());
        assert!(reader.require_reader_access(6).is_err());
        assert!(reader.require_staff().is_err());
        assert!(reader.require_reporting().is_err());
    }
}
