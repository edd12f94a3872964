//! Adapter registry with base-URL prefix resolution.
//!
//! The [`AdapterRegistry`] is built once at startup through
//! [`AdapterRegistryBuilder`] and is immutable afterwards; share it behind an
//! `Arc`.

use std::sync::Arc;

use tracing::{debug, warn};

use super::sites::{
    BakaUpdates, LightNovelsTranslations, NovelUpdates, RaisingTheDead, ReadLightNovel,
    ReadNovelFull, Reddit,
};
use super::{CatalogSource, DatabaseSource, Source, SourceAdapter};
use crate::fetch::HttpFetcher;

/// Immutable set of source and database adapters.
///
/// Resolution returns the first adapter, in registration order, whose base
/// URL is a string prefix of the queried URL. When two registered base URLs
/// are prefixes of each other the winner is whichever was registered first;
/// callers should not rely on that and should register unambiguous prefixes.
#[derive(Default)]
pub struct AdapterRegistry {
    sources: Vec<SourceAdapter>,
    databases: Vec<Arc<dyn DatabaseSource>>,
}

impl AdapterRegistry {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::default()
    }

    /// Returns the source adapter (any capability) handling `url`.
    #[must_use]
    pub fn resolve_source(&self, url: &str) -> Option<&SourceAdapter> {
        let found = self.sources.iter().find(|source| source.handles(url));
        debug!(url, adapter = found.map(SourceAdapter::id), "resolved source");
        found
    }

    /// Returns the catalog-capable adapter handling `url`.
    ///
    /// Base-only adapters are not considered, even if their prefix matches.
    #[must_use]
    pub fn resolve_catalog_source(&self, url: &str) -> Option<Arc<dyn CatalogSource>> {
        self.catalog_sources()
            .find(|catalog| url.starts_with(catalog.base_url()))
    }

    /// Returns the database adapter handling `url`.
    #[must_use]
    pub fn resolve_database(&self, url: &str) -> Option<Arc<dyn DatabaseSource>> {
        self.databases
            .iter()
            .find(|database| url.starts_with(database.base_url()))
            .cloned()
    }

    /// Returns the database adapter with the given id.
    #[must_use]
    pub fn database(&self, id: &str) -> Option<Arc<dyn DatabaseSource>> {
        self.databases
            .iter()
            .find(|database| database.id() == id)
            .cloned()
    }

    /// All source adapters in registration order.
    #[must_use]
    pub fn sources(&self) -> &[SourceAdapter] {
        &self.sources
    }

    /// Catalog-capable adapters in registration order.
    pub fn catalog_sources(&self) -> impl Iterator<Item = Arc<dyn CatalogSource>> + '_ {
        self.sources
            .iter()
            .filter_map(|source| source.as_catalog().cloned())
    }

    /// All database adapters in registration order.
    #[must_use]
    pub fn databases(&self) -> &[Arc<dyn DatabaseSource>] {
        &self.databases
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let database_ids: Vec<&str> = self.databases.iter().map(|d| d.id()).collect();
        f.debug_struct("AdapterRegistry")
            .field("sources", &self.sources)
            .field("databases", &database_ids)
            .finish()
    }
}

/// Collects adapters before freezing them into an [`AdapterRegistry`].
#[derive(Default)]
pub struct AdapterRegistryBuilder {
    registry: AdapterRegistry,
}

impl AdapterRegistryBuilder {
    /// Registers a base-capability source.
    #[must_use]
    pub fn source(mut self, source: Arc<dyn Source>) -> Self {
        self.push_source(SourceAdapter::Base(source));
        self
    }

    /// Registers a catalog-capable source.
    #[must_use]
    pub fn catalog(mut self, source: Arc<dyn CatalogSource>) -> Self {
        self.push_source(SourceAdapter::Catalog(source));
        self
    }

    /// Registers a database adapter.
    #[must_use]
    pub fn database(mut self, database: Arc<dyn DatabaseSource>) -> Self {
        if database.base_url().is_empty() {
            warn!(id = database.id(), "database adapter has empty base URL; skipping");
            return self;
        }
        if self.registry.database(database.id()).is_some() {
            warn!(id = database.id(), "duplicate database id; later registration is unreachable by id");
        }
        debug!(id = database.id(), base_url = database.base_url(), "registering database");
        self.registry.databases.push(database);
        self
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> AdapterRegistry {
        self.registry
    }

    fn push_source(&mut self, adapter: SourceAdapter) {
        // An empty prefix would claim every URL.
        if adapter.base_url().is_empty() {
            warn!(id = adapter.id(), "source adapter has empty base URL; skipping");
            return;
        }
        if let Some(earlier) = self
            .registry
            .sources
            .iter()
            .find(|earlier| prefixes_overlap(earlier.base_url(), adapter.base_url()))
        {
            warn!(
                id = adapter.id(),
                earlier = earlier.id(),
                "base URL overlaps an earlier source; the earlier registration wins for shared URLs"
            );
        }
        debug!(id = adapter.id(), base_url = adapter.base_url(), "registering source");
        self.registry.sources.push(adapter);
    }
}

fn prefixes_overlap(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Builds the registry of bundled adapters, all sharing one fetcher.
#[must_use]
pub fn build_default_registry(fetcher: &HttpFetcher) -> AdapterRegistry {
    AdapterRegistry::builder()
        .catalog(Arc::new(ReadNovelFull::new(fetcher.clone())))
        .catalog(Arc::new(ReadLightNovel::new(fetcher.clone())))
        .catalog(Arc::new(LightNovelsTranslations::new(fetcher.clone())))
        .source(Arc::new(Reddit::new()))
        .source(Arc::new(RaisingTheDead::new()))
        .database(Arc::new(NovelUpdates::new(fetcher.clone())))
        .database(Arc::new(BakaUpdates::new(fetcher.clone())))
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::fetch::Document;
    use crate::library::{BookData, BookMetadata, ChapterMetadata};
    use crate::outcome::{Outcome, ScrapeError};
    use crate::source::GenreMap;

    struct Fake {
        id: &'static str,
        base_url: &'static str,
    }

    impl Source for Fake {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            self.id
        }
        fn base_url(&self) -> &str {
            self.base_url
        }
        fn chapter_text(&self, _doc: &Document) -> Result<String, ScrapeError> {
            Ok(String::new())
        }
    }

    #[async_trait]
    impl CatalogSource for Fake {
        async fn chapter_list(&self, _doc: &Document) -> Result<Vec<ChapterMetadata>, ScrapeError> {
            Ok(Vec::new())
        }
        async fn catalog_list(&self, _index: usize) -> Outcome<Vec<BookMetadata>> {
            Ok(Vec::new())
        }
        async fn catalog_search(&self, _index: usize, _input: &str) -> Outcome<Vec<BookMetadata>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl DatabaseSource for Fake {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            self.id
        }
        fn base_url(&self) -> &str {
            self.base_url
        }
        async fn search(&self, _index: usize, _input: &str) -> Outcome<Vec<BookMetadata>> {
            Ok(Vec::new())
        }
        async fn search_advanced(
            &self,
            _index: usize,
            _included: &[String],
            _excluded: &[String],
        ) -> Outcome<Vec<BookMetadata>> {
            Ok(Vec::new())
        }
        async fn search_genres(&self) -> Outcome<GenreMap> {
            Ok(GenreMap::new())
        }
        fn book_data(&self, _doc: &Document) -> Result<BookData, ScrapeError> {
            Ok(BookData::default())
        }
    }

    fn fake(id: &'static str, base_url: &'static str) -> Arc<Fake> {
        Arc::new(Fake { id, base_url })
    }

    fn registry() -> AdapterRegistry {
        AdapterRegistry::builder()
            .catalog(fake("alpha", "https://alpha.example/"))
            .source(fake("beta", "https://beta.example/"))
            .database(fake("db", "https://db.example/"))
            .build()
    }

    #[test]
    fn test_resolve_source_matches_prefix_of_any_capability() {
        let registry = registry();
        assert_eq!(
            registry.resolve_source("https://alpha.example/book/1").unwrap().id(),
            "alpha"
        );
        assert_eq!(
            registry.resolve_source("https://beta.example/c/2").unwrap().id(),
            "beta"
        );
    }

    #[test]
    fn test_resolve_source_none_without_prefix_match() {
        let registry = registry();
        assert!(registry.resolve_source("https://gamma.example/").is_none());
        // Prefix match is literal: a different scheme does not match.
        assert!(registry.resolve_source("http://alpha.example/book").is_none());
    }

    #[test]
    fn test_resolve_catalog_source_ignores_base_only_adapters() {
        let registry = registry();
        assert!(registry.resolve_catalog_source("https://alpha.example/x").is_some());
        assert!(registry.resolve_catalog_source("https://beta.example/x").is_none());
    }

    #[test]
    fn test_resolve_database_by_url_and_id() {
        let registry = registry();
        assert_eq!(
            registry.resolve_database("https://db.example/series/x").unwrap().id(),
            "db"
        );
        assert!(registry.resolve_database("https://alpha.example/").is_none());
        assert_eq!(registry.database("db").unwrap().base_url(), "https://db.example/");
        assert!(registry.database("missing").is_none());
    }

    #[test]
    fn test_overlapping_prefixes_resolve_in_registration_order() {
        let registry = AdapterRegistry::builder()
            .source(fake("short", "https://site.example/"))
            .source(fake("long", "https://site.example/novels/"))
            .build();
        assert_eq!(
            registry
                .resolve_source("https://site.example/novels/1")
                .unwrap()
                .id(),
            "short"
        );
        assert!(prefixes_overlap("https://site.example/", "https://site.example/novels/"));
        assert!(!prefixes_overlap("https://a.example/", "https://b.example/"));
    }

    #[test]
    fn test_empty_base_url_is_not_registered() {
        let registry = AdapterRegistry::builder()
            .source(fake("empty", ""))
            .build();
        assert!(registry.sources().is_empty());
        assert!(registry.resolve_source("https://anything.example/").is_none());
    }

    #[test]
    fn test_default_registry_contains_bundled_adapters() {
        let fetcher = HttpFetcher::new().unwrap();
        let registry = build_default_registry(&fetcher);

        assert_eq!(registry.sources().len(), 5);
        assert_eq!(registry.catalog_sources().count(), 3);
        assert!(registry.database("novel_updates").is_some());
        assert!(registry.database("baka_updates").is_some());
        assert!(
            registry
                .resolve_source("https://www.reddit.com/r/noveltranslations/comments/x")
                .is_some()
        );
        let debug = format!("{registry:?}");
        assert!(debug.contains("read_novel_full"));
    }
}
