//! Thư viện library management server
//!
//! REST JSON API covering the book catalog, readers and memberships,
//! circulation with reservation queues, fines and receipts, stock
//! management and period reports.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod rules;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
