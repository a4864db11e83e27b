//! Book (catalog title) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{enums::BookStatus, StatEntry};

/// Book from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub category: Option<String>,
    /// ISBN-10 or ISBN-13, digits only
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publish_year: Option<i32>,
    /// Copies owned by the library
    pub total_quantity: i32,
    /// Copies currently on the shelf
    pub available_quantity: i32,
    pub shelf_location: Option<String>,
    pub status: BookStatus,
    /// Cover image path or URL
    pub cover_image: Option<String>,
    /// Replacement value, used when assessing damage and loss fines
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Matches title, author or ISBN
    pub search: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub status: Option<BookStatus>,
    /// Only titles with at least one copy on the shelf
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub author: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "Invalid publish year"))]
    pub publish_year: Option<i32>,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: i32,
    /// Defaults to total_quantity
    #[validate(range(min = 0, message = "Available quantity cannot be negative"))]
    pub available_quantity: Option<i32>,
    pub shelf_location: Option<String>,
    pub cover_image: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// Update book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "Invalid publish year"))]
    pub publish_year: Option<i32>,
    /// Changing the total shifts the available count by the same delta
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: Option<i32>,
    pub shelf_location: Option<String>,
    pub status: Option<BookStatus>,
    pub cover_image: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// Catalog statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct BookStats {
    pub total_titles: i64,
    pub withdrawn_titles: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub borrowed_copies: i64,
    pub by_category: Vec<StatEntry>,
}
