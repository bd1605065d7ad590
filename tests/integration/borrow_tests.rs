//! Borrow workflow integration tests

use reqwest::Client;
use serde_json::Value;

use crate::{borrow_book, create_book, register_user, BASE_URL};

async fn get_book(client: &Client, book_id: i64) -> Value {
    client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse book")
}

async fn return_borrow(client: &Client, token: &str, borrow_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/borrowings/{}/return", BASE_URL, borrow_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send return request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_user_can_borrow_an_available_book() {
    let client = Client::new();
    let (admin_token, _) = register_user(&client, "Admin").await;
    let (user_token, _) = register_user(&client, "User").await;
    let book_id = create_book(&client, &admin_token).await;

    let response = borrow_book(&client, &user_token, book_id).await;
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "active");
    assert_eq!(body["is_overdue"], false);
    assert_eq!(body["days_overdue"], 0);
    assert_eq!(body["book"]["id"].as_i64(), Some(book_id));
    assert_eq!(body["book"]["available"], false);
    assert!(body["returned_at"].is_null());

    // Due date is the loan period after borrowed_at
    let borrowed_at: chrono::DateTime<chrono::Utc> =
        body["borrowed_at"].as_str().unwrap().parse().unwrap();
    let due_date: chrono::DateTime<chrono::Utc> =
        body["due_date"].as_str().unwrap().parse().unwrap();
    assert_eq!(due_date - borrowed_at, chrono::Duration::days(14));

    // Availability flips off in the catalog
    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], false);

    // And the borrow shows up in the user's active history
    let response = client
        .get(format!("{}/me/borrowings", BASE_URL))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrows = body.as_array().expect("Expected array");
    assert_eq!(borrows.len(), 1);
    assert_eq!(borrows[0]["book"]["id"].as_i64(), Some(book_id));
    assert_eq!(borrows[0]["user"].as_object(), None);
}

#[tokio::test]
#[ignore]
async fn test_user_cannot_borrow_unavailable_book() {
    let client = Client::new();
    let (admin_token, _) = register_user(&client, "Admin").await;
    let (first_token, _) = register_user(&client, "User").await;
    let (second_token, _) = register_user(&client, "User").await;
    let book_id = create_book(&client, &admin_token).await;

    let response = borrow_book(&client, &first_token, book_id).await;
    assert_eq!(response.status(), 201);

    let response = borrow_book(&client, &second_token, book_id).await;
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "This book is currently unavailable.");
}

#[tokio::test]
#[ignore]
async fn test_borrow_unknown_book_is_not_found() {
    let client = Client::new();
    let (user_token, _) = register_user(&client, "User").await;

    let response = borrow_book(&client, &user_token, 999_999_999).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_user_cannot_exceed_borrow_limit() {
    let client = Client::new();
    let (admin_token, _) = register_user(&client, "Admin").await;
    let (user_token, _) = register_user(&client, "User").await;

    for _ in 0..3 {
        let book_id = create_book(&client, &admin_token).await;
        let response = borrow_book(&client, &user_token, book_id).await;
        assert_eq!(response.status(), 201);
    }

    let extra_book = create_book(&client, &admin_token).await;
    let response = borrow_book(&client, &user_token, extra_book).await;
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.expect("Failed to parse response");
    let message = body["message"].as_str().expect("No message");
    assert!(message.contains("limit: 3"));

    // The rejected book stays available
    let book = get_book(&client, extra_book).await;
    assert_eq!(book["available"], true);
}

#[tokio::test]
#[ignore]
async fn test_user_can_return_borrowed_book() {
    let client = Client::new();
    let (admin_token, _) = register_user(&client, "Admin").await;
    let (user_token, user_id) = register_user(&client, "User").await;
    let book_id = create_book(&client, &admin_token).await;

    let response = borrow_book(&client, &user_token, book_id).await;
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow id");

    let response = return_borrow(&client, &user_token, borrow_id).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "returned");
    assert_eq!(body["is_overdue"], false);
    assert!(body["returned_at"].is_string());
    assert_eq!(body["book"]["available"], true);
    assert_eq!(body["user"]["id"].as_i64(), Some(user_id));

    // Availability flips back on in the catalog
    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], true);
}

#[tokio::test]
#[ignore]
async fn test_second_return_conflicts_and_keeps_availability() {
    let client = Client::new();
    let (admin_token, _) = register_user(&client, "Admin").await;
    let (user_token, _) = register_user(&client, "User").await;
    let book_id = create_book(&client, &admin_token).await;

    let response = borrow_book(&client, &user_token, book_id).await;
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow id");

    let response = return_borrow(&client, &user_token, borrow_id).await;
    assert_eq!(response.status(), 200);

    let response = return_borrow(&client, &user_token, borrow_id).await;
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "This borrow record is already closed.");

    // Availability was not toggled twice
    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], true);
}

#[tokio::test]
#[ignore]
async fn test_user_cannot_return_other_users_borrow() {
    let client = Client::new();
    let (admin_token, _) = register_user(&client, "Admin").await;
    let (owner_token, _) = register_user(&client, "User").await;
    let (other_token, _) = register_user(&client, "User").await;
    let book_id = create_book(&client, &admin_token).await;

    let response = borrow_book(&client, &owner_token, book_id).await;
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow id");

    let response = return_borrow(&client, &other_token, borrow_id).await;
    assert_eq!(response.status(), 403);

    // The record stays open and the book stays out
    let book = get_book(&client, book_id).await;
    assert_eq!(book["available"], false);
}

#[tokio::test]
#[ignore]
async fn test_admin_can_return_any_borrow() {
    let client = Client::new();
    let (admin_token, _) = register_user(&client, "Admin").await;
    let (user_token, _) = register_user(&client, "User").await;
    let book_id = create_book(&client, &admin_token).await;

    let response = borrow_book(&client, &user_token, book_id).await;
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow id");

    let response = return_borrow(&client, &admin_token, borrow_id).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "returned");
}

#[tokio::test]
#[ignore]
async fn test_admin_can_list_all_borrowings() {
    let client = Client::new();
    let (admin_token, _) = register_user(&client, "Admin").await;
    let (user_token, _) = register_user(&client, "User").await;
    let book_id = create_book(&client, &admin_token).await;

    let response = borrow_book(&client, &user_token, book_id).await;
    assert_eq!(response.status(), 201);

    let response = client
        .get(format!("{}/borrowings", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let borrows = body.as_array().expect("Expected array");
    assert!(!borrows.is_empty());
    // Admin view carries the borrower
    assert!(borrows[0]["user"].is_object());

    // Non-admins are rejected
    let response = client
        .get(format!("{}/borrowings", BASE_URL))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}
