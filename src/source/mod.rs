//! Source and database adapters.
//!
//! Adapters translate one external site's pages into the uniform library
//! model. Capabilities are expressed as traits:
//!
//! - [`Source`] - extracts chapter text, optionally canonicalizes chapter URLs
//! - [`CatalogSource`] - a [`Source`] that also lists chapters and pages its catalog
//! - [`DatabaseSource`] - a separate namespace of book databases (search, genres, book data)
//!
//! [`SourceAdapter`] tags a registered source with its capability set, and
//! [`AdapterRegistry`] resolves URLs to adapters by base URL prefix.
//!
//! # Object Safety
//!
//! The traits use `async_trait` so adapters can be stored as `Arc<dyn ...>`
//! in the registry.

mod genre_cache;
mod registry;
pub mod sites;
pub(crate) mod text;

pub use genre_cache::GenreCache;
pub use registry::{AdapterRegistry, AdapterRegistryBuilder, build_default_registry};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::fetch::Document;
use crate::library::{BookData, BookMetadata, ChapterMetadata};
use crate::outcome::{Outcome, ScrapeError};

/// Genre name to site-specific genre id.
pub type GenreMap = BTreeMap<String, String>;

/// Base capability: a site chapters can be read from.
pub trait Source: Send + Sync {
    /// Stable identifier (e.g. `"read_novel_full"`).
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// URL prefix this adapter handles.
    fn base_url(&self) -> &str;

    /// Extracts chapter text from a chapter page.
    ///
    /// # Errors
    ///
    /// Returns a [`ScrapeError`] when the page lacks the expected structure.
    fn chapter_text(&self, doc: &Document) -> Result<String, ScrapeError>;

    /// Canonicalizes a chapter URL before the final content fetch. Identity by default.
    fn transform_chapter_url(&self, url: &str) -> String {
        url.to_string()
    }
}

/// Catalog capability: chapter lists plus paged catalog listing and search.
#[async_trait]
pub trait CatalogSource: Source {
    /// Extracts the chapter list from a book page, issuing secondary requests if the site needs them.
    ///
    /// # Errors
    ///
    /// Returns a [`ScrapeError`] on missing structure or failed secondary requests.
    async fn chapter_list(&self, doc: &Document) -> Result<Vec<ChapterMetadata>, ScrapeError>;

    /// Returns catalog page `index` (0-based). An empty page ends the catalog.
    async fn catalog_list(&self, index: usize) -> Outcome<Vec<BookMetadata>>;

    /// Returns search results page `index` (0-based) for `input`.
    async fn catalog_search(&self, index: usize, input: &str) -> Outcome<Vec<BookMetadata>>;
}

/// Database capability: book search, genre search and book data pages.
#[async_trait]
pub trait DatabaseSource: Send + Sync {
    /// Stable identifier used for persistence and configuration.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// URL prefix this adapter handles.
    fn base_url(&self) -> &str;

    /// Returns search results page `index` (0-based) for `input`.
    async fn search(&self, index: usize, input: &str) -> Outcome<Vec<BookMetadata>>;

    /// Returns page `index` of books matching all included and none of the excluded genre ids.
    async fn search_advanced(
        &self,
        index: usize,
        genres_included: &[String],
        genres_excluded: &[String],
    ) -> Outcome<Vec<BookMetadata>>;

    /// Returns the genres usable with [`search_advanced`](Self::search_advanced).
    ///
    /// Uncached; go through [`GenreCache`] to reuse successful results.
    async fn search_genres(&self) -> Outcome<GenreMap>;

    /// Extracts book data from a book page.
    ///
    /// # Errors
    ///
    /// Returns a [`ScrapeError`] when the page lacks the expected structure.
    fn book_data(&self, doc: &Document) -> Result<BookData, ScrapeError>;
}

/// A registered source tagged with its capability set.
#[derive(Clone)]
pub enum SourceAdapter {
    /// Chapter text only.
    Base(Arc<dyn Source>),
    /// Chapter text plus catalog.
    Catalog(Arc<dyn CatalogSource>),
}

impl SourceAdapter {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Base(source) => source.id(),
            Self::Catalog(source) => source.id(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Base(source) => source.name(),
            Self::Catalog(source) => source.name(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        match self {
            Self::Base(source) => source.base_url(),
            Self::Catalog(source) => source.base_url(),
        }
    }

    /// Delegates to [`Source::chapter_text`].
    ///
    /// # Errors
    ///
    /// Propagates the adapter's [`ScrapeError`].
    pub fn chapter_text(&self, doc: &Document) -> Result<String, ScrapeError> {
        match self {
            Self::Base(source) => source.chapter_text(doc),
            Self::Catalog(source) => source.chapter_text(doc),
        }
    }

    /// Delegates to [`Source::transform_chapter_url`].
    #[must_use]
    pub fn transform_chapter_url(&self, url: &str) -> String {
        match self {
            Self::Base(source) => source.transform_chapter_url(url),
            Self::Catalog(source) => source.transform_chapter_url(url),
        }
    }

    /// Returns the catalog capability, if this adapter has it.
    #[must_use]
    pub fn as_catalog(&self) -> Option<&Arc<dyn CatalogSource>> {
        match self {
            Self::Base(_) => None,
            Self::Catalog(source) => Some(source),
        }
    }

    /// True when `url` starts with this adapter's base URL.
    #[must_use]
    pub fn handles(&self, url: &str) -> bool {
        url.starts_with(self.base_url())
    }
}

impl std::fmt::Debug for SourceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let capability = match self {
            Self::Base(_) => "Base",
            Self::Catalog(_) => "Catalog",
        };
        f.debug_struct("SourceAdapter")
            .field("id", &self.id())
            .field("capability", &capability)
            .field("base_url", &self.base_url())
            .finish()
    }
}
