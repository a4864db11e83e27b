//! Thư viện Server - Library Management System
//!
//! REST API server for library management.

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thuvien_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    tracing::info!("Starting Thư viện Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool);
    let services = Services::new(repository, &config);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Structured logs: RUST_LOG wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("thuvien_server={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Books
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route("/books/categories", get(api::books::list_categories))
        .route("/books/stats", get(api::books::book_stats))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        .route("/books/:id/reservations", get(api::reservations::book_queue))
        // Readers
        .route("/readers", get(api::readers::list_readers).post(api::readers::create_reader))
        .route("/readers/stats", get(api::readers::reader_stats))
        .route("/readers/expire-memberships", post(api::readers::expire_memberships))
        .route(
            "/readers/:id",
            get(api::readers::get_reader)
                .put(api::readers::update_reader)
                .delete(api::readers::delete_reader),
        )
        .route("/readers/:id/membership", post(api::readers::request_membership))
        .route("/readers/:id/lock", post(api::readers::lock_reader))
        .route("/readers/:id/unlock", post(api::readers::unlock_reader))
        .route("/readers/:id/borrows", get(api::readers::reader_borrows))
        .route("/readers/:id/fines", get(api::readers::reader_fines))
        // Users
        .route("/users", get(api::users::list_users).post(api::users::create_user))
        .route("/users/me", get(api::users::get_me))
        .route("/users/stats", get(api::users::user_stats))
        .route(
            "/users/:id",
            get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        // Borrows
        .route("/borrows", get(api::borrows::list_borrows).post(api::borrows::create_borrow))
        .route("/borrows/stats", get(api::borrows::borrow_stats))
        .route("/borrows/mark-overdue", post(api::borrows::mark_overdue))
        .route(
            "/borrows/:id",
            get(api::borrows::get_borrow)
                .put(api::borrows::update_borrow)
                .delete(api::borrows::delete_borrow),
        )
        .route("/borrows/:id/return", post(api::borrows::return_borrow))
        .route("/borrows/:id/renew", post(api::borrows::renew_borrow))
        // Reservations
        .route(
            "/reservations",
            get(api::reservations::list_reservations).post(api::reservations::create_reservation),
        )
        .route("/reservations/stats", get(api::reservations::reservation_stats))
        .route("/reservations/expire", post(api::reservations::expire_reservations))
        .route(
            "/reservations/:id",
            get(api::reservations::get_reservation)
                .put(api::reservations::update_reservation)
                .delete(api::reservations::delete_reservation),
        )
        .route("/reservations/:id/cancel", post(api::reservations::cancel_reservation))
        .route("/reservations/:id/fulfill", post(api::reservations::fulfill_reservation))
        // Violations
        .route(
            "/violations",
            get(api::violations::list_violations).post(api::violations::create_violation),
        )
        .route("/violations/stats", get(api::violations::violation_stats))
        .route(
            "/violations/:id",
            get(api::violations::get_violation)
                .put(api::violations::update_violation)
                .delete(api::violations::delete_violation),
        )
        .route("/violations/:id/process", post(api::violations::process_violation))
        // Fines
        .route("/fines", get(api::fines::list_fines).post(api::fines::create_fine))
        .route("/fines/calculate", get(api::fines::calculate_fine))
        .route("/fines/stats", get(api::fines::fine_stats))
        .route(
            "/fines/:id",
            get(api::fines::get_fine)
                .put(api::fines::update_fine)
                .delete(api::fines::delete_fine),
        )
        .route("/fines/:id/pay", post(api::fines::pay_fine))
        // Receipts
        .route("/receipts", get(api::receipts::list_receipts).post(api::receipts::create_receipt))
        .route("/receipts/stats", get(api::receipts::receipt_stats))
        .route(
            "/receipts/:id",
            get(api::receipts::get_receipt)
                .put(api::receipts::update_receipt)
                .delete(api::receipts::delete_receipt),
        )
        .route("/receipts/:id/collect", post(api::receipts::collect_receipt))
        .route("/receipts/:id/cancel", post(api::receipts::cancel_receipt))
        // Inventory
        .route("/inventory", get(api::inventory::list_stock))
        .route("/inventory/low-stock", get(api::inventory::low_stock))
        .route("/inventory/stats", get(api::inventory::inventory_stats))
        .route("/inventory/books/:id", get(api::inventory::get_stock))
        .route("/inventory/books/:id/adjust", post(api::inventory::adjust_stock))
        // Stock-ins
        .route(
            "/stock-ins",
            get(api::stock_ins::list_stock_ins).post(api::stock_ins::create_stock_in),
        )
        .route("/stock-ins/stats", get(api::stock_ins::stock_in_stats))
        .route(
            "/stock-ins/:id",
            get(api::stock_ins::get_stock_in)
                .put(api::stock_ins::update_stock_in)
                .delete(api::stock_ins::delete_stock_in),
        )
        // Inventory checks
        .route(
            "/inventory-checks",
            get(api::inventory_checks::list_checks).post(api::inventory_checks::create_check),
        )
        .route("/inventory-checks/stats", get(api::inventory_checks::check_stats))
        .route(
            "/inventory-checks/:id",
            get(api::inventory_checks::get_check)
                .put(api::inventory_checks::update_check)
                .delete(api::inventory_checks::delete_check),
        )
        .route("/inventory-checks/:id/complete", post(api::inventory_checks::complete_check))
        // Proposals
        .route(
            "/proposals",
            get(api::proposals::list_proposals).post(api::proposals::create_proposal),
        )
        .route("/proposals/stats", get(api::proposals::proposal_stats))
        .route(
            "/proposals/:id",
            get(api::proposals::get_proposal)
                .put(api::proposals::update_proposal)
                .delete(api::proposals::delete_proposal),
        )
        .route("/proposals/:id/approve", post(api::proposals::approve_proposal))
        .route("/proposals/:id/reject", post(api::proposals::reject_proposal))
        // Reports
        .route("/reports/borrowing", get(api::reports::borrowing_report))
        .route("/reports/revenue", get(api::reports::revenue_report))
        .route("/reports/inventory", get(api::reports::inventory_report))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
