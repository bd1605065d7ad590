//! Borrow workflow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::borrow::{BorrowDetails, BorrowFilter},
};

use super::AuthenticatedUser;

/// Borrow a book request
#[derive(Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    /// Book ID
    pub book_id: i32,
}

/// Status filter query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BorrowQuery {
    /// "active" or "all"
    pub status: Option<BorrowFilter>,
}

/// Borrow a book for the authenticated user
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowDetails),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Book unavailable or borrowing limit reached")
    )
)]
pub async fn create_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowDetails>)> {
    let borrow = state
        .services
        .borrows
        .borrow_book(claims.user_id, request.book_id)
        .await?;

    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Return a borrowed book (owner or admin)
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = BorrowDetails),
        (status = 403, description = "Not the borrower and not an administrator"),
        (status = 404, description = "Borrow record not found"),
        (status = 409, description = "Borrow record already closed")
    )
)]
pub async fn return_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(borrow_id): Path<i32>,
) -> AppResult<Json<BorrowDetails>> {
    let borrow = state
        .services
        .borrows
        .return_book(claims.user_id, claims.role, borrow_id)
        .await?;

    Ok(Json(borrow))
}

/// List all borrow records (admin)
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter: active or all (default all)")
    ),
    responses(
        (status = 200, description = "All borrow records", body = Vec<BorrowDetails>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    claims.require_admin()?;

    let filter = query.status.unwrap_or(BorrowFilter::All);
    let borrows = state.services.borrows.list_borrows(filter).await?;
    Ok(Json(borrows))
}

/// Borrow history for the authenticated user
#[utoipa::path(
    get,
    path = "/me/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter: active or all (default active)")
    ),
    responses(
        (status = 200, description = "The caller's borrow records", body = Vec<BorrowDetails>)
    )
)]
pub async fn my_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    let filter = query.status.unwrap_or(BorrowFilter::Active);
    let borrows = state
        .services
        .borrows
        .list_user_borrows(claims.user_id, filter)
        .await?;
    Ok(Json(borrows))
}
