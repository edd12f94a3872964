//! Library data model: catalog entries, chapters, tracked books and book data.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// URL schemes that identify locally imported books.
const LOCAL_SCHEMES: [&str; 2] = ["file://", "content://"];

/// A catalog or search entry; not yet a tracked library item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookMetadata {
    /// Display title.
    pub title: String,
    /// Book page URL.
    pub url: String,
}

impl BookMetadata {
    /// Creates a catalog entry.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A chapter reference scoped to one book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterMetadata {
    /// Chapter title.
    pub title: String,
    /// Chapter page URL.
    pub url: String,
}

impl ChapterMetadata {
    /// Creates a chapter reference.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A tracked library book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Book {
    /// Book page URL (primary key).
    pub url: String,
    /// Display title.
    pub title: String,
    /// Whether the book is marked finished.
    pub completed: bool,
    /// Whether the book is currently in the library.
    pub in_library: bool,
}

impl Book {
    /// Creates an in-library, not completed book.
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            completed: false,
            in_library: true,
        }
    }

    /// Returns true for locally imported books, which have no remote source to update from.
    #[must_use]
    pub fn is_local(&self) -> bool {
        LOCAL_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

/// A persisted chapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Chapter {
    /// Chapter title.
    pub title: String,
    /// Chapter page URL (primary key).
    pub url: String,
    /// Owning book URL.
    pub book_url: String,
    /// Index in the most recently merged remote list.
    pub position: i64,
    /// Read state, preserved across merges.
    pub read: bool,
}

impl Chapter {
    /// Returns the chapter's metadata view.
    #[must_use]
    pub fn metadata(&self) -> ChapterMetadata {
        ChapterMetadata::new(self.title.clone(), self.url.clone())
    }
}

/// A credited author on a database entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookAuthor {
    /// Author name.
    pub name: String,
    /// Author page, when the database links one.
    pub url: Option<String>,
}

/// Everything a database adapter extracts from a book page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookData {
    pub title: String,
    pub description: String,
    pub alternative_titles: Vec<String>,
    pub authors: Vec<BookAuthor>,
    pub tags: Vec<String>,
    pub genres: Vec<String>,
    pub book_type: String,
    pub related_books: Vec<BookMetadata>,
    pub similar_recommended: Vec<BookMetadata>,
}
