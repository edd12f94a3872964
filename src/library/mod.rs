//! Library storage: tracked books and their chapters.
//!
//! This module provides the `SQLite`-backed [`Library`] and the
//! [`LibraryStore`] contract the rest of the crate depends on.
//!
//! # Overview
//!
//! - [`Book`] - Tracked library item
//! - [`Chapter`] - Persisted chapter with position and read state
//! - [`BookMetadata`] / [`ChapterMetadata`] - Remote listings, not yet stored
//! - [`StoreError`] - Operation error types
//!
//! # Example
//!
//! ```ignore
//! use bookshelf_core::library::{Book, ChapterMetadata, Library};
//! use bookshelf_core::Database;
//!
//! let library = Library::new(Database::new_in_memory().await?);
//! library.add_book(&Book::new("https://example.com/novel", "Novel")).await?;
//! library
//!     .merge(&[ChapterMetadata::new("Ch 1", "https://example.com/c1")], "https://example.com/novel")
//!     .await?;
//! ```

mod error;
mod model;
mod repository;

pub use error::{StoreError, StoreErrorKind};
pub use model::{Book, BookAuthor, BookData, BookMetadata, Chapter, ChapterMetadata};
pub use repository::LibraryStore;

use tracing::{debug, instrument};

use crate::db::Database;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// `SQLite`-backed library.
#[derive(Debug, Clone)]
pub struct Library {
    db: Database,
}

impl Library {
    /// Creates a library over an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Adds a book to the library, or returns an existing row to it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the upsert fails.
    #[instrument(skip(self, book), fields(url = %book.url))]
    pub async fn add_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r"INSERT INTO book (url, title, completed, in_library)
              VALUES (?, ?, ?, 1)
              ON CONFLICT(url) DO UPDATE SET in_library = 1, title = excluded.title",
        )
        .bind(&book.url)
        .bind(&book.title)
        .bind(book.completed)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Looks up a stored book by URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn get_book(&self, url: &str) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT url, title, completed, in_library FROM book WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(book)
    }

    /// Returns every book currently in the library, ordered by title.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn library_books(&self) -> Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT url, title, completed, in_library FROM book WHERE in_library = 1 ORDER BY title",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(books)
    }

    /// Returns the in-library, non-local books whose completion flag equals `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn books_for_update(&self, completed: bool) -> Result<Vec<Book>> {
        let books = self
            .library_books()
            .await?
            .into_iter()
            .filter(|book| book.completed == completed && !book.is_local())
            .collect::<Vec<_>>();
        debug!(count = books.len(), "books selected for update");
        Ok(books)
    }

    /// Sets the completion flag of a book.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BookNotFound`] if no such book is stored.
    pub async fn set_completed(&self, url: &str, completed: bool) -> Result<()> {
        let result = sqlx::query("UPDATE book SET completed = ? WHERE url = ?")
            .bind(completed)
            .bind(url)
            .execute(self.db.pool())
            .await?;
        check_book_affected(url, result.rows_affected())
    }

    /// Takes a book out of the library. Its chapters stay stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BookNotFound`] if no such book is stored.
    pub async fn remove_book(&self, url: &str) -> Result<()> {
        let result = sqlx::query("UPDATE book SET in_library = 0 WHERE url = ?")
            .bind(url)
            .execute(self.db.pool())
            .await?;
        check_book_affected(url, result.rows_affected())
    }

    /// Returns stored chapters for a book, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn chapters(&self, book_url: &str) -> Result<Vec<Chapter>> {
        let chapters = sqlx::query_as::<_, Chapter>(
            r"SELECT title, url, book_url, position, read
              FROM chapter WHERE book_url = ? ORDER BY position",
        )
        .bind(book_url)
        .fetch_all(self.db.pool())
        .await?;
        Ok(chapters)
    }

    /// Returns true when at least one chapter is stored for the book.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn has_chapters(&self, book_url: &str) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM chapter WHERE book_url = ?")
                .bind(book_url)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count > 0)
    }

    /// Upserts a remote chapter list in one transaction.
    ///
    /// Titles and positions follow the new list; read state of chapters
    /// already stored is kept. Chapters missing from the list are not deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if any statement fails; nothing is committed then.
    #[instrument(skip(self, chapters), fields(book_url = %book_url, count = chapters.len()))]
    pub async fn merge(&self, chapters: &[ChapterMetadata], book_url: &str) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        for (position, chapter) in chapters.iter().enumerate() {
            sqlx::query(
                r"INSERT INTO chapter (url, book_url, title, position, read)
                  VALUES (?, ?, ?, ?, 0)
                  ON CONFLICT(url) DO UPDATE SET
                      book_url = excluded.book_url,
                      title = excluded.title,
                      position = excluded.position",
            )
            .bind(&chapter.url)
            .bind(book_url)
            .bind(&chapter.title)
            .bind(position_of(position))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Inserts chapters not stored yet; existing rows are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if any statement fails; nothing is committed then.
    #[instrument(skip(self, chapters), fields(book_url = %book_url, count = chapters.len()))]
    pub async fn insert(&self, chapters: &[ChapterMetadata], book_url: &str) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        for (position, chapter) in chapters.iter().enumerate() {
            sqlx::query(
                r"INSERT OR IGNORE INTO chapter (url, book_url, title, position, read)
                  VALUES (?, ?, ?, ?, 0)",
            )
            .bind(&chapter.url)
            .bind(book_url)
            .bind(&chapter.title)
            .bind(position_of(position))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Sets the read state of the given chapters. Unknown URLs are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if an update fails.
    pub async fn set_read(&self, chapter_urls: &[String], read: bool) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        for url in chapter_urls {
            sqlx::query("UPDATE chapter SET read = ? WHERE url = ?")
                .bind(read)
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn position_of(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

fn check_book_affected(url: &str, rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(StoreError::BookNotFound(url.to_string()))
    } else {
        Ok(())
    }
}
