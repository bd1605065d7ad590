//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with pagination
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book with ISBN uniqueness check
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::Conflict(format!(
                "A book with ISBN {} already exists.",
                book.isbn
            )));
        }

        self.repository.books.create(&book).await
    }

    /// Update bibliographic fields of a book
    pub async fn update_book(&self, id: i32, changes: UpdateBook) -> AppResult<Book> {
        if let Some(ref isbn) = changes.isbn {
            if self.repository.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "A book with ISBN {} already exists.",
                    isbn
                )));
            }
        }

        self.repository.books.update(id, &changes).await
    }

    /// Delete a book. Refused while an open borrow record references it.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        // Ensure a 404 for unknown ids before the borrow check
        self.repository.books.get_by_id(id).await?;

        if self.repository.books.has_open_borrow(id).await? {
            return Err(AppError::Conflict(
                "Cannot delete a book with an open borrow record.".to_string(),
            ));
        }

        self.repository.books.delete(id).await
    }
}
