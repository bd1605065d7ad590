//! Borrow workflow service
//!
//! Owns the borrow/return transitions and the invariant that a book is
//! unavailable exactly while an open borrow record exists for it. Every
//! operation runs its precondition checks and both store mutations inside a
//! single database transaction; an early error return drops the transaction
//! and rolls everything back.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{Borrow, BorrowDetails, BorrowFilter, BorrowState},
        user::Role,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
}

impl BorrowsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow a book for the given user.
    ///
    /// Checks, in order: the book exists, it is available, and the user is
    /// under the active-borrow limit. The book row is locked up front so
    /// concurrent borrows of the same book serialize; the user row is locked
    /// before the limit count so concurrent borrows by the same user do too.
    pub async fn borrow_book(&self, user_id: i32, book_id: i32) -> AppResult<BorrowDetails> {
        let mut tx = self.repository.pool.begin().await?;

        let mut book = self.repository.books.get_for_update(&mut tx, book_id).await?;

        if !book.available {
            return Err(AppError::Unprocessable(
                "This book is currently unavailable.".to_string(),
            ));
        }

        self.repository.users.lock_row(&mut tx, user_id).await?;
        let active_borrows = self
            .repository
            .borrows
            .count_open_for_user(&mut tx, user_id)
            .await?;
        if active_borrows >= Borrow::MAX_ACTIVE_BORROWS {
            return Err(AppError::LimitExceeded(Borrow::MAX_ACTIVE_BORROWS));
        }

        let now = Utc::now();
        let borrow = self
            .repository
            .borrows
            .create(&mut tx, user_id, book_id, now, Borrow::due_date_from(now))
            .await?;
        self.repository
            .books
            .set_availability(&mut tx, book_id, false)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Borrow {} created: user {} borrowed book {}",
            borrow.id,
            user_id,
            book_id
        );

        book.available = false;
        Ok(BorrowDetails::project(&borrow, Some(book.into()), None, now))
    }

    /// Return a borrowed book.
    ///
    /// The already-closed check runs before the authorization check, so a
    /// second return attempt yields Conflict regardless of who asks. Only
    /// the borrowing user, or a role that may return any borrow, may close
    /// the record.
    pub async fn return_book(
        &self,
        actor_id: i32,
        actor_role: Role,
        borrow_id: i32,
    ) -> AppResult<BorrowDetails> {
        let mut tx = self.repository.pool.begin().await?;

        let borrow = self
            .repository
            .borrows
            .get_for_update(&mut tx, borrow_id)
            .await?;

        if let BorrowState::Closed { .. } = borrow.state() {
            return Err(AppError::Conflict(
                "This borrow record is already closed.".to_string(),
            ));
        }

        if actor_id != borrow.user_id && !actor_role.can_return_any_borrow() {
            return Err(AppError::Forbidden(
                "You are not authorized to return this book.".to_string(),
            ));
        }

        let now = Utc::now();
        self.repository
            .borrows
            .set_returned(&mut tx, borrow.id, now)
            .await?;
        self.repository
            .books
            .set_availability(&mut tx, borrow.book_id, true)
            .await?;

        tx.commit().await?;

        tracing::info!("Borrow {} returned by user {}", borrow.id, actor_id);

        // Fresh relations for the response
        let book = self.repository.books.get_by_id(borrow.book_id).await?;
        let user = self.repository.users.get_by_id(borrow.user_id).await?;

        let closed = Borrow {
            returned_at: Some(now),
            ..borrow
        };
        Ok(BorrowDetails::project(
            &closed,
            Some(book.into()),
            Some(user.into()),
            now,
        ))
    }

    /// All borrow records (admin view), newest first
    pub async fn list_borrows(&self, filter: BorrowFilter) -> AppResult<Vec<BorrowDetails>> {
        let rows = self.repository.borrows.list_all(filter).await?;
        let now = Utc::now();

        Ok(rows
            .into_iter()
            .map(|(borrow, book, user)| {
                BorrowDetails::project(&borrow, Some(book), Some(user), now)
            })
            .collect())
    }

    /// Borrow history for one user, newest first
    pub async fn list_user_borrows(
        &self,
        user_id: i32,
        filter: BorrowFilter,
    ) -> AppResult<Vec<BorrowDetails>> {
        let rows = self.repository.borrows.list_for_user(user_id, filter).await?;
        let now = Utc::now();

        Ok(rows
            .into_iter()
            .map(|(borrow, book)| BorrowDetails::project(&borrow, Some(book), None, now))
            .collect())
    }
}
