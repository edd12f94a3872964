//! Bookshelf Core Library
//!
//! This library keeps a local library of serialized books in sync with the
//! sites they are published on. Sites are reached through pluggable adapters;
//! everything that touches the network reports through a uniform result
//! envelope instead of raising.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - HTTP retrieval with fixed headers and bounded timeouts
//! - [`outcome`] - Result envelope and the `try_connect` error boundary
//! - [`source`] - Adapter capability traits, registry/resolver, bundled sites
//! - [`content`] - Chapter text, chapter list and book data retrieval
//! - [`paging`] - Restartable page iterator for catalogs and searches
//! - [`library`] - Tracked books and chapters in `SQLite`
//! - [`update`] - Host-partitioned library update orchestrator
//! - [`db`] - Database connection and schema management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod content;
pub mod db;
pub mod fetch;
pub mod library;
pub mod outcome;
pub mod paging;
pub mod source;
pub mod update;
pub(crate) mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use content::{ChapterListProvider, ContentService};
pub use db::Database;
pub use fetch::{Document, FetchError, HttpFetcher};
pub use library::{
    Book, BookAuthor, BookData, BookMetadata, Chapter, ChapterMetadata, Library, LibraryStore,
    StoreError,
};
pub use outcome::{Outcome, ScrapeError, SourceError, SourceErrorKind, try_connect};
pub use paging::{PagedFetcher, PagingEvent, Phase};
pub use source::{
    AdapterRegistry, CatalogSource, DatabaseSource, GenreCache, GenreMap, Source, SourceAdapter,
    build_default_registry,
};
pub use update::{
    FailedUpdate, LibraryUpdater, NewUpdate, UpdateProgress, UpdateState, UpdateSummary,
};
