//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{
        books, borrows, fines, health, inventory, inventory_checks, proposals, readers, receipts, reports,
        reservations, stock_ins, users, violations,
    },
    models,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Thư viện API",
        version = "1.0.0",
        description = "Library management REST API: catalog, circulation, fines, stock and reports"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_categories,
        books::book_stats,
        // Readers
        readers::list_readers,
        readers::get_reader,
        readers::create_reader,
        readers::update_reader,
        readers::delete_reader,
        readers::request_membership,
        readers::lock_reader,
        readers::unlock_reader,
        readers::expire_memberships,
        readers::reader_borrows,
        readers::reader_fines,
        readers::reader_stats,
        // Users
        users::list_users,
        users::get_user,
        users::get_me,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::user_stats,
        // Borrows
        borrows::list_borrows,
        borrows::get_borrow,
        borrows::create_borrow,
        borrows::update_borrow,
        borrows::delete_borrow,
        borrows::return_borrow,
        borrows::renew_borrow,
        borrows::mark_overdue,
        borrows::borrow_stats,
        // Reservations
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::create_reservation,
        reservations::update_reservation,
        reservations::delete_reservation,
        reservations::cancel_reservation,
        reservations::fulfill_reservation,
        reservations::expire_reservations,
        reservations::book_queue,
        reservations::reservation_stats,
        // Violations
        violations::list_violations,
        violations::get_violation,
        violations::create_violation,
        violations::update_violation,
        violations::delete_violation,
        violations::process_violation,
        violations::violation_stats,
        // Fines
        fines::list_fines,
        fines::get_fine,
        fines::create_fine,
        fines::update_fine,
        fines::delete_fine,
        fines::pay_fine,
        fines::calculate_fine,
        fines::fine_stats,
        // Receipts
        receipts::list_receipts,
        receipts::get_receipt,
        receipts::create_receipt,
        receipts::update_receipt,
        receipts::delete_receipt,
        receipts::collect_receipt,
        receipts::cancel_receipt,
        receipts::receipt_stats,
        // Inventory
        inventory::list_stock,
        inventory::get_stock,
        inventory::low_stock,
        inventory::adjust_stock,
        inventory::inventory_stats,
        // Stock-ins
        stock_ins::list_stock_ins,
        stock_ins::get_stock_in,
        stock_ins::create_stock_in,
        stock_ins::update_stock_in,
        stock_ins::delete_stock_in,
        stock_ins::stock_in_stats,
        // Inventory checks
        inventory_checks::list_checks,
        inventory_checks::get_check,
        inventory_checks::create_check,
        inventory_checks::update_check,
        inventory_checks::delete_check,
        inventory_checks::complete_check,
        inventory_checks::check_stats,
        // Proposals
        proposals::list_proposals,
        proposals::get_proposal,
        proposals::create_proposal,
        proposals::update_proposal,
        proposals::delete_proposal,
        proposals::approve_proposal,
        proposals::reject_proposal,
        proposals::proposal_stats,
        // Reports
        reports::borrowing_report,
        reports::revenue_report,
        reports::inventory_report,
    ),
    components(
        schemas(
            // Shared
            models::StatEntry,
            models::AmountEntry,
            models::BookStatus,
            models::MembershipTier,
            models::MembershipStatus,
            models::Role,
            models::BorrowStatus,
            models::ReturnCondition,
            models::ReceiptKind,
            models::ReceiptStatus,
            models::ViolationKind,
            models::Severity,
            models::ViolationStatus,
            models::ReservationStatus,
            models::CheckStatus,
            models::ProposalStatus,
            super::SweepResponse,
            // Books
            models::book::Book,
            models::book::BookQuery,
            models::book::CreateBook,
            models::book::UpdateBook,
            models::book::BookStats,
            // Readers
            models::reader::Reader,
            models::reader::ReaderQuery,
            models::reader::CreateReader,
            models::reader::UpdateReader,
            models::reader::MembershipRequest,
            models::reader::ReaderStats,
            // Users
            models::user::User,
            models::user::UserQuery,
            models::user::CreateUser,
            models::user::UpdateUser,
            models::user::UserStats,
            // Borrows
            models::borrow::BorrowTicket,
            models::borrow::BorrowLine,
            models::borrow::BorrowDetails,
            models::borrow::BorrowSummary,
            models::borrow::BorrowQuery,
            models::borrow::CreateBorrow,
            models::borrow::UpdateBorrow,
            models::borrow::ReturnLine,
            models::borrow::ReturnBorrow,
            models::borrow::ReturnResult,
            models::borrow::BorrowStats,
            // Reservations
            models::reservation::Reservation,
            models::reservation::ReservationQuery,
            models::reservation::CreateReservation,
            models::reservation::UpdateReservation,
            models::reservation::QueueEntry,
            models::reservation::ExpireResult,
            models::reservation::ReservationStats,
            // Violations and fines
            models::violation::Violation,
            models::violation::ViolationQuery,
            models::violation::CreateViolation,
            models::violation::UpdateViolation,
            models::violation::FineQuery,
            models::violation::FineAssessment,
            models::violation::FineListQuery,
            models::violation::CreateFine,
            models::violation::ReaderFines,
            models::violation::ViolationStats,
            // Receipts
            models::receipt::Receipt,
            models::receipt::ReceiptQuery,
            models::receipt::CreateReceipt,
            models::receipt::UpdateReceipt,
            models::receipt::ReceiptStatsQuery,
            models::receipt::ReceiptStats,
            // Inventory
            models::inventory::StockLevel,
            models::inventory::StockQuery,
            models::inventory::StockAdjustment,
            models::inventory::InventoryStats,
            models::inventory::InventoryCheck,
            models::inventory::InventoryCheckLine,
            models::inventory::InventoryCheckDetails,
            models::inventory::InventoryCheckQuery,
            models::inventory::CountLine,
            models::inventory::CreateInventoryCheck,
            models::inventory::UpdateInventoryCheck,
            models::inventory::InventoryCheckStats,
            // Stock-ins
            models::stock_in::StockIn,
            models::stock_in::StockInLine,
            models::stock_in::StockInDetails,
            models::stock_in::StockInQuery,
            models::stock_in::CreateStockInLine,
            models::stock_in::CreateStockIn,
            models::stock_in::UpdateStockIn,
            models::stock_in::StockInStats,
            // Proposals
            models::proposal::PurchaseProposal,
            models::proposal::ProposalQuery,
            models::proposal::CreateProposal,
            models::proposal::UpdateProposal,
            models::proposal::ReviewProposal,
            models::proposal::ProposalStats,
            // Reports
            models::report::ReportQuery,
            models::report::BorrowingReport,
            models::report::MonthlyRevenue,
            models::report::RevenueReport,
            models::report::InventoryReport,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "readers", description = "Library members and memberships"),
        (name = "users", description = "Staff and reader accounts"),
        (name = "borrows", description = "Borrow tickets, returns and renewals"),
        (name = "reservations", description = "Reservation queues"),
        (name = "violations", description = "Rule violations"),
        (name = "fines", description = "Fine receipts"),
        (name = "receipts", description = "Financial transactions"),
        (name = "inventory", description = "Stock positions"),
        (name = "stock_ins", description = "Goods received"),
        (name = "inventory_checks", description = "Stock counts"),
        (name = "proposals", description = "Purchase proposals"),
        (name = "reports", description = "Period reports")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the secured paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_secured_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/books"));
        assert!(doc.paths.paths.contains_key("/borrows/{id}/return"));
        assert!(doc.paths.paths.contains_key("/inventory/books/{id}/adjust"));
        assert!(doc
            .components
            .as_ref()
            .map(|c| c.security_schemes.contains_key("bearer_auth"))
            .unwrap_or(false));
    }
}
