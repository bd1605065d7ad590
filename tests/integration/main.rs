//! Integration tests against a running server
//!
//! Run with: cargo test -- --ignored

mod api_tests;
mod borrow_tests;

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

pub const BASE_URL: &str = "http://localhost:8080/api";

/// Unique suffix so repeated runs do not collide on unique columns
pub fn unique(tag: &str) -> String {
    format!("{}-{}", tag, nanos())
}

/// Unique 13-digit ISBN
pub fn unique_isbn() -> String {
    format!("978{:010}", nanos() % 10_000_000_000)
}

fn nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos()
}

/// Register a user with the given role and return (token, user id)
pub async fn register_user(client: &Client, role: &str) -> (String, i64) {
    let email = format!("{}@example.com", unique("user"));
    let response = client
        .post(format!("{}/register", BASE_URL))
        .json(&json!({
            "name": "Test User",
            "email": email,
            "role": role,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse register response");
    let token = body["token"].as_str().expect("No token in response").to_string();
    let user_id = body["user"]["id"].as_i64().expect("No user id in response");
    (token, user_id)
}

/// Create a book as admin and return its id
pub async fn create_book(client: &Client, admin_token: &str) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "title": "The Test Book",
            "author": "A. Writer",
            "isbn": unique_isbn(),
            "publication_year": 2020
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse book response");
    body["id"].as_i64().expect("No book id")
}

/// Borrow a book and return the response
pub async fn borrow_book(client: &Client, token: &str, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/borrowings", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send borrow request")
}
