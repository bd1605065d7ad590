//! Borrow ledger repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookSummary,
        borrow::{Borrow, BorrowFilter},
        user::{Role, UserSummary},
    },
};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrow record by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrow> {
        sqlx::query_as::<_, Borrow>("SELECT * FROM borrows WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// Get borrow record by ID with a row lock, inside the caller's
    /// transaction. Two concurrent returns of the same record serialize here.
    pub async fn get_for_update(&self, conn: &mut PgConnection, id: i32) -> AppResult<Borrow> {
        sqlx::query_as::<_, Borrow>("SELECT * FROM borrows WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// Count open (unreturned) borrow records for a user, inside the
    /// caller's transaction
    pub async fn count_open_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrows WHERE user_id = $1 AND returned_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// Insert a new open borrow record, inside the caller's transaction
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
        borrowed_at: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Borrow> {
        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            INSERT INTO borrows (user_id, book_id, borrowed_at, due_date, returned_at)
            VALUES ($1, $2, $3, $4, NULL)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(borrowed_at)
        .bind(due_date)
        .fetch_one(conn)
        .await?;

        Ok(borrow)
    }

    /// Close a borrow record, inside the caller's transaction
    pub async fn set_returned(
        &self,
        conn: &mut PgConnection,
        id: i32,
        returned_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE borrows SET returned_at = $2 WHERE id = $1")
            .bind(id)
            .bind(returned_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// All borrow records with book and user, newest first
    pub async fn list_all(
        &self,
        filter: BorrowFilter,
    ) -> AppResult<Vec<(Borrow, BookSummary, UserSummary)>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.user_id, b.book_id, b.borrowed_at, b.due_date, b.returned_at,
                   bk.title as book_title, bk.author as book_author, bk.isbn as book_isbn,
                   bk.publication_year as book_publication_year, bk.available as book_available,
                   u.name as user_name, u.email as user_email,
                   u.library_id as user_library_id, u.role as user_role
            FROM borrows b
            JOIN books bk ON b.book_id = bk.id
            JOIN users u ON b.user_id = u.id
            WHERE ($1 = FALSE OR b.returned_at IS NULL)
            ORDER BY b.borrowed_at DESC
            "#,
        )
        .bind(filter == BorrowFilter::Active)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::new();
        for row in rows {
            let borrow = Self::borrow_from_row(&row)?;
            let book = Self::book_summary_from_row(&row)?;
            let user = UserSummary {
                id: row.get("user_id"),
                name: row.get("user_name"),
                email: row.get("user_email"),
                library_id: row.get("user_library_id"),
                role: row.get::<Role, _>("user_role"),
            };
            result.push((borrow, book, user));
        }

        Ok(result)
    }

    /// One user's borrow records with book, newest first
    pub async fn list_for_user(
        &self,
        user_id: i32,
        filter: BorrowFilter,
    ) -> AppResult<Vec<(Borrow, BookSummary)>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.user_id, b.book_id, b.borrowed_at, b.due_date, b.returned_at,
                   bk.title as book_title, bk.author as book_author, bk.isbn as book_isbn,
                   bk.publication_year as book_publication_year, bk.available as book_available
            FROM borrows b
            JOIN books bk ON b.book_id = bk.id
            WHERE b.user_id = $1 AND ($2 = FALSE OR b.returned_at IS NULL)
            ORDER BY b.borrowed_at DESC
            "#,
        )
        .bind(user_id)
        .bind(filter == BorrowFilter::Active)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::new();
        for row in rows {
            let borrow = Self::borrow_from_row(&row)?;
            let book = Self::book_summary_from_row(&row)?;
            result.push((borrow, book));
        }

        Ok(result)
    }

    fn borrow_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Borrow> {
        Ok(Borrow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            book_id: row.try_get("book_id")?,
            borrowed_at: row.try_get("borrowed_at")?,
            due_date: row.try_get("due_date")?,
            returned_at: row.try_get("returned_at")?,
        })
    }

    fn book_summary_from_row(row: &sqlx::postgres::PgRow) -> AppResult<BookSummary> {
        Ok(BookSummary {
            id: row.try_get("book_id")?,
            title: row.try_get("book_title")?,
            author: row.try_get("book_author")?,
            isbn: row.try_get("book_isbn")?,
            publication_year: row.try_get("book_publication_year")?,
            available: row.try_get("book_available")?,
        })
    }
}
