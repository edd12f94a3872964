//! Chapter and book retrieval through the adapter registry.
//!
//! [`ContentService`] ties the fetch gateway to adapter resolution:
//!
//! - [`download_chapter_content`](ContentService::download_chapter_content)
//!   follows redirects and resolves the adapter from the *final* URL
//! - [`download_chapter_list`](ContentService::download_chapter_list) and
//!   [`fetch_chapter_list`](ContentService::fetch_chapter_list) (cache-first)
//! - [`download_book_data`](ContentService::download_book_data)
//!
//! Every operation returns an [`Outcome`]; nothing raised below escapes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::fetch::HttpFetcher;
use crate::library::{BookData, Chapter, ChapterMetadata, LibraryStore};
use crate::outcome::{Outcome, ScrapeError, SourceError, try_connect};
use crate::source::AdapterRegistry;

/// Supplies the current remote chapter list of a book.
///
/// The update orchestrator depends on this seam rather than on
/// [`ContentService`] directly.
#[async_trait]
pub trait ChapterListProvider: Send + Sync {
    /// Fetches the book's chapter list from its source.
    async fn chapter_list(&self, book_url: &str) -> Outcome<Vec<ChapterMetadata>>;
}

/// Retrieval operations over the adapter registry.
#[derive(Debug, Clone)]
pub struct ContentService {
    fetcher: HttpFetcher,
    registry: Arc<AdapterRegistry>,
}

impl ContentService {
    #[must_use]
    pub fn new(fetcher: HttpFetcher, registry: Arc<AdapterRegistry>) -> Self {
        Self { fetcher, registry }
    }

    #[must_use]
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Downloads a chapter's text.
    ///
    /// Many chapter links are redirectors, so the adapter is chosen from the
    /// URL the request finally landed on. The adapter's
    /// [`transform_chapter_url`](crate::source::Source::transform_chapter_url)
    /// is then applied and the page re-fetched only if the URL changed.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnsupportedSource`] when no adapter matches the final URL;
    /// `Timeout` or `Unknown` for retrieval and extraction failures.
    #[instrument(skip(self))]
    pub async fn download_chapter_content(&self, url: &str) -> Outcome<String> {
        try_connect(&format!("url: {url}"), || async {
            let landed = self.fetcher.fetch_document(url).await?;
            let final_url = landed.url().to_string();

            let Some(adapter) = self.registry.resolve_source(&final_url) else {
                return Err(ScrapeError::Unsupported {
                    url: url.to_string(),
                    redirect_url: (final_url != url).then_some(final_url),
                });
            };

            let canonical = adapter.transform_chapter_url(&final_url);
            let doc = if canonical == final_url {
                landed
            } else {
                debug!(from = %final_url, to = %canonical, "re-fetching transformed chapter url");
                self.fetcher.fetch_document(&canonical).await?
            };

            adapter.chapter_text(&doc)
        })
        .await
    }

    /// Downloads a book's chapter list from its catalog adapter.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnsupportedSource`] when no catalog adapter matches;
    /// `Timeout` or `Unknown` otherwise.
    #[instrument(skip(self))]
    pub async fn download_chapter_list(&self, book_url: &str) -> Outcome<Vec<ChapterMetadata>> {
        let Some(catalog) = self.registry.resolve_catalog_source(book_url) else {
            return Err(SourceError::unsupported(book_url));
        };

        try_connect(&format!("url: {book_url}"), || async {
            let doc = self.fetcher.fetch_document(book_url).await?;
            catalog.chapter_list(&doc).await
        })
        .await
    }

    /// Returns the book's chapters, preferring what storage already has.
    ///
    /// With `try_cache` and stored chapters present, storage is returned as
    /// is. Otherwise the list is downloaded, inserted (existing rows are kept)
    /// and storage's resulting view is returned.
    ///
    /// # Errors
    ///
    /// Same as [`download_chapter_list`](Self::download_chapter_list), plus
    /// `Unknown` for storage failures.
    #[instrument(skip(self, store))]
    pub async fn fetch_chapter_list(
        &self,
        store: &dyn LibraryStore,
        book_url: &str,
        try_cache: bool,
    ) -> Outcome<Vec<Chapter>> {
        if try_cache {
            let cached = try_connect(&format!("url: {book_url}"), || async {
                store.chapters(book_url).await.map_err(ScrapeError::from)
            })
            .await?;
            if !cached.is_empty() {
                debug!(count = cached.len(), "chapter list served from storage");
                return Ok(cached);
            }
        }

        let remote = self.download_chapter_list(book_url).await?;
        try_connect(&format!("url: {book_url}"), || async {
            store.insert(&remote, book_url).await?;
            Ok::<_, ScrapeError>(store.chapters(book_url).await?)
        })
        .await
    }

    /// Downloads a book's database entry.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnsupportedSource`] when no database adapter matches;
    /// `Timeout` or `Unknown` otherwise.
    #[instrument(skip(self))]
    pub async fn download_book_data(&self, url: &str) -> Outcome<BookData> {
        let Some(database) = self.registry.resolve_database(url) else {
            return Err(SourceError::unsupported(url));
        };

        try_connect(&format!("url: {url}"), || async {
            let doc = self.fetcher.fetch_document(url).await?;
            database.book_data(&doc)
        })
        .await
    }
}

#[async_trait]
impl ChapterListProvider for ContentService {
    async fn chapter_list(&self, book_url: &str) -> Outcome<Vec<ChapterMetadata>> {
        self.download_chapter_list(book_url).await
    }
}
