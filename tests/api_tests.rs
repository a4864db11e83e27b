//! API integration tests
//!
//! These run against a live server with an empty database:
//! `cargo test -- --ignored`. Tokens are minted with the server's secret.

use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

use thuvien_server::models::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn mint_token(role: Role, reader_id: Option<i32>) -> String {
    let secret =
        std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("{}-tester", role),
        user_id: 1,
        role,
        reader_id,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&secret)
    .expect("Failed to sign token")
}

fn admin() -> String {
    mint_token(Role::Admin, None)
}

/// ISBN-13 in the 978-604 range with a valid check digit
fn isbn13(seed: u32) -> String {
    let body = format!("978604{:06}", seed % 1_000_000);
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    format!("{}{}", body, (10 - sum % 10) % 10)
}

async fn post_json(client: &Client, token: &str, path: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request")
}

async fn create_book(client: &Client, title: &str, copies: i32) -> i64 {
    let response = post_json(
        client,
        &admin(),
        "/books",
        json!({ "title": title, "total_quantity": copies, "price": "120000" }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book ID")
}

/// A reader with a collected membership fee, ready to borrow
async fn create_member(client: &Client, name: &str) -> i64 {
    let token = admin();
    let response = post_json(client, &token, "/readers", json!({ "full_name": name })).await;
    assert_eq!(response.status(), 201);
    let reader: Value = response.json().await.expect("Failed to parse response");
    let reader_id = reader["id"].as_i64().expect("No reader ID");

    let response = post_json(
        client,
        &token,
        &format!("/readers/{}/membership", reader_id),
        json!({ "months": 12 }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let receipt: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(receipt["status"], "pending");

    let response = post_json(
        client,
        &token,
        &format!("/receipts/{}/collect", receipt["id"]),
        json!({}),
    )
    .await;
    assert!(response.status().is_success());

    reader_id
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_pings_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_missing_token_is_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_warehouse_cannot_lend() {
    let client = Client::new();

    let response = post_json(
        &client,
        &mint_token(Role::Warehouse, None),
        "/borrows",
        json!({ "reader_id": 1, "book_ids": [1] }),
    )
    .await;

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_list_books_is_paginated() {
    let client = Client::new();
    create_book(&client, "Paging Test", 1).await;

    let response = client
        .get(format!("{}/books?per_page=500", BASE_URL))
        .bearer_auth(mint_token(Role::Reader, Some(1)))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
    assert_eq!(body["per_page"], 100);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_is_a_conflict() {
    let client = Client::new();
    let token = admin();
    let isbn = isbn13(Utc::now().timestamp_subsec_nanos());

    let first = post_json(
        &client,
        &token,
        "/books",
        json!({ "title": "First", "total_quantity": 1, "isbn": isbn }),
    )
    .await;
    assert_eq!(first.status(), 201);

    let second = post_json(
        &client,
        &token,
        "/books",
        json!({ "title": "Second", "total_quantity": 1, "isbn": isbn }),
    )
    .await;
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_restores_stock() {
    let client = Client::new();
    let token = admin();
    let book_id = create_book(&client, "Circulation Test", 2).await;
    let reader_id = create_member(&client, "Circulation Reader").await;

    let response = post_json(
        &client,
        &token,
        "/borrows",
        json!({ "reader_id": reader_id, "book_ids": [book_id] }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let borrow: Value = response.json().await.expect("Failed to parse response");
    let ticket_id = borrow["ticket"]["id"].as_i64().expect("No ticket ID");
    assert_eq!(borrow["ticket"]["status"], "borrowed");

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["available_quantity"], 1);

    let response = post_json(&client, &token, &format!("/borrows/{}/return", ticket_id), json!({})).await;
    assert!(response.status().is_success());
    let result: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(result["borrow"]["ticket"]["status"], "returned");
    assert_eq!(result["days_late"], 0);

    let response = post_json(&client, &token, &format!("/borrows/{}/return", ticket_id), json!({})).await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_borrowing_requires_paid_membership() {
    let client = Client::new();
    let token = admin();
    let book_id = create_book(&client, "Membership Test", 1).await;

    let response = post_json(&client, &token, "/readers", json!({ "full_name": "Unpaid Reader" })).await;
    let reader: Value = response.json().await.expect("Failed to parse response");

    let response = post_json(
        &client,
        &token,
        "/borrows",
        json!({ "reader_id": reader["id"], "book_ids": [book_id] }),
    )
    .await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "MembershipInactive");
}

#[tokio::test]
#[ignore]
async fn test_reservation_is_served_on_return() {
    let client = Client::new();
    let token = admin();
    let book_id = create_book(&client, "Queue Test", 1).await;
    let holder = create_member(&client, "First Reader").await;
    let waiter = create_member(&client, "Second Reader").await;

    let response = post_json(
        &client,
        &token,
        "/borrows",
        json!({ "reader_id": holder, "book_ids": [book_id] }),
    )
    .await;
    let borrow: Value = response.json().await.expect("Failed to parse response");
    let ticket_id = borrow["ticket"]["id"].as_i64().expect("No ticket ID");

    // The waiting reader reserves with their own account
    let response = post_json(
        &client,
        &mint_token(Role::Reader, Some(waiter as i32)),
        "/reservations",
        json!({ "reader_id": waiter, "book_id": book_id }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let reservation: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(reservation["status"], "pending");

    // Renewal is blocked while someone waits
    let response = post_json(&client, &token, &format!("/borrows/{}/renew", ticket_id), json!({})).await;
    assert_eq!(response.status(), 422);

    let response = post_json(&client, &token, &format!("/borrows/{}/return", ticket_id), json!({})).await;
    let result: Value = response.json().await.expect("Failed to parse response");
    let ready = result["ready_reservations"].as_array().expect("No ready list");
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0]["id"], reservation["id"]);
    assert_eq!(ready[0]["status"], "ready_for_pickup");

    let response = post_json(
        &client,
        &token,
        &format!("/reservations/{}/fulfill", reservation["id"]),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_readers_only_see_their_own_records() {
    let client = Client::new();
    let reader_id = create_member(&client, "Private Reader").await;
    let other = create_member(&client, "Other Reader").await;
    let token = mint_token(Role::Reader, Some(reader_id as i32));

    let response = client
        .get(format!("{}/readers/{}/fines", BASE_URL, reader_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/readers/{}/borrows", BASE_URL, other))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_fine_preview() {
    let client = Client::new();

    let response = client
        .get(format!("{}/fines/calculate?kind=late&days_late=3", BASE_URL))
        .bearer_auth(mint_token(Role::Accountant, None))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["days_late"], 3);
    assert!(body["total"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_stock_in_and_inventory_check() {
    let client = Client::new();
    let token = mint_token(Role::Warehouse, None);
    let book_id = create_book(&client, "Stock Test", 2).await;

    let response = post_json(
        &client,
        &token,
        "/stock-ins",
        json!({
            "supplier": "Nhà sách Test",
            "lines": [{ "book_id": book_id, "quantity": 3, "unit_price": "50000" }]
        }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let stock_in: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(stock_in["stock_in"]["total_amount"], "150000");

    let level: Value = client
        .get(format!("{}/inventory/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(level["total_quantity"], 5);

    let response = post_json(
        &client,
        &token,
        "/inventory-checks",
        json!({ "lines": [{ "book_id": book_id, "actual_quantity": 4 }] }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let check: Value = response.json().await.expect("Failed to parse response");
    let check_id = check["check"]["id"].as_i64().expect("No check ID");

    let response = post_json(
        &client,
        &token,
        &format!("/inventory-checks/{}/complete", check_id),
        json!({}),
    )
    .await;
    assert!(response.status().is_success());
    let completed: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(completed["check"]["status"], "completed");
    assert_eq!(completed["lines"][0]["variance"], -1);

    let response = post_json(
        &client,
        &token,
        &format!("/inventory-checks/{}/complete", check_id),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_only_admin_reviews_proposals() {
    let client = Client::new();

    let response = post_json(
        &client,
        &mint_token(Role::Librarian, None),
        "/proposals",
        json!({ "title": "Requested Title", "quantity": 2 }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let proposal: Value = response.json().await.expect("Failed to parse response");
    let path = format!("/proposals/{}/approve", proposal["id"]);

    let response = post_json(&client, &mint_token(Role::Librarian, None), &path, json!({})).await;
    assert_eq!(response.status(), 403);

    let response = post_json(&client, &admin(), &path, json!({})).await;
    assert!(response.status().is_success());
    let approved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(approved["status"], "approved");

    let response = post_json(&client, &admin(), &path, json!({})).await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_revenue_report_rejects_inverted_period() {
    let client = Client::new();

    let response = client
        .get(format!("{}/reports/revenue?from=2024-12-31&to=2024-01-01", BASE_URL))
        .bearer_auth(mint_token(Role::Accountant, None))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}
