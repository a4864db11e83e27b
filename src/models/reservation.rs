//! Book reservation (hold queue) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{enums::ReservationStatus, StatEntry};

/// Reservation joined with reader and book names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub reader_id: i32,
    pub reader_name: String,
    pub book_id: i32,
    pub book_title: String,
    pub reserved_at: DateTime<Utc>,
    /// Set when the reservation becomes ready for pickup
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reservation list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReservationQuery {
    pub reader_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<ReservationStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Reserve a book with no copy on the shelf
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub reader_id: i32,
    pub book_id: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateReservation {
    pub notes: Option<String>,
}

/// Position of a reservation in its book's queue
#[derive(Debug, Serialize, ToSchema)]
pub struct QueueEntry {
    pub position: i64,
    pub reservation: Reservation,
}

/// Reservation with the reader's contact, used for notifications
#[derive(Debug, Clone, FromRow)]
pub struct HoldNotice {
    pub reservation_id: i32,
    pub reader_name: String,
    pub reader_email: Option<String>,
    pub book_title: String,
    pub hold_expires_at: Option<DateTime<Utc>>,
}

/// Outcome of a hold expiry sweep
#[derive(Debug, Serialize, ToSchema)]
pub struct ExpireResult {
    pub expired: i64,
    pub promoted: Vec<Reservation>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationStats {
    pub pending: i64,
    pub ready_for_pickup: i64,
    pub by_status: Vec<StatEntry>,
    /// Books with the longest queues
    pub most_reserved: Vec<StatEntry>,
}
