//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by ID with a row lock, inside the caller's transaction.
    ///
    /// Concurrent borrow attempts against the same book serialize here; the
    /// loser re-reads committed state after the winner commits.
    pub async fn get_for_update(&self, conn: &mut PgConnection, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Flip the availability flag, inside the caller's transaction
    pub async fn set_availability(
        &self,
        conn: &mut PgConnection,
        id: i32,
        available: bool,
    ) -> AppResult<()> {
        sqlx::query("UPDATE books SET available = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(available)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Search books with pagination, ordered by title
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let (books, total) = if let Some(ref term) = query.search {
            let pattern = format!("%{}%", term.to_lowercase());
            let books = sqlx::query_as::<_, Book>(
                r#"
                SELECT * FROM books
                WHERE LOWER(title) LIKE $1 OR LOWER(author) LIKE $1 OR LOWER(isbn) LIKE $1
                ORDER BY title
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(&pattern)
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

            let total: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM books
                WHERE LOWER(title) LIKE $1 OR LOWER(author) LIKE $1 OR LOWER(isbn) LIKE $1
                "#,
            )
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

            (books, total)
        } else {
            let books =
                sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title LIMIT $1 OFFSET $2")
                    .bind(per_page)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;

            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
                .fetch_one(&self.pool)
                .await?;

            (books, total)
        };

        Ok((books, total))
    }

    /// Create a new book (available by default)
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, publication_year, available)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.publication_year)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update bibliographic fields of a book. Availability is not touched
    /// here; only the borrow workflow mutates it.
    pub async fn update(&self, id: i32, changes: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                publication_year = COALESCE($5, publication_year),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(&changes.isbn)
        .bind(changes.publication_year)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Whether an open borrow record exists for this book
    pub async fn has_open_borrow(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrows WHERE book_id = $1 AND returned_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Check if another book already carries this ISBN
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }
}
