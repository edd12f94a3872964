//! Storage collaborator contract used by the content service and the updater.
//!
//! [`Library`] is the `SQLite` implementation; tests substitute in-memory
//! fakes to observe ordering and failure handling.

use async_trait::async_trait;

use super::{Chapter, ChapterMetadata, Library, Result};

/// Read/merge contract over stored chapters.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Returns stored chapters for a book, ordered by position.
    async fn chapters(&self, book_url: &str) -> Result<Vec<Chapter>>;

    /// Upserts `chapters` keyed by URL, keeping each existing chapter's read state.
    async fn merge(&self, chapters: &[ChapterMetadata], book_url: &str) -> Result<()>;

    /// Inserts chapters that are not stored yet; existing rows are left untouched.
    async fn insert(&self, chapters: &[ChapterMetadata], book_url: &str) -> Result<()>;

    /// Returns true when at least one chapter is stored for the book.
    async fn has_chapters(&self, book_url: &str) -> Result<bool>;
}

#[async_trait]
impl LibraryStore for Library {
    async fn chapters(&self, book_url: &str) -> Result<Vec<Chapter>> {
        Library::chapters(self, book_url).await
    }

    async fn merge(&self, chapters: &[ChapterMetadata], book_url: &str) -> Result<()> {
        Library::merge(self, chapters, book_url).await
    }

    async fn insert(&self, chapters: &[ChapterMetadata], book_url: &str) -> Result<()> {
        Library::insert(self, chapters, book_url).await
    }

    async fn has_chapters(&self, book_url: &str) -> Result<bool> {
        Library::has_chapters(self, book_url).await
    }
}
