//! Catalog and database browsing handlers, driven by the paged fetcher.

use anyhow::{Result, anyhow};
use bookshelf_core::{BookMetadata, GenreCache, PagedFetcher, PagingEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use super::AppContext;

/// Prints up to `max_pages` pages, stopping early when the listing ends.
async fn print_pages(
    fetcher: &PagedFetcher<BookMetadata>,
    events: &mut UnboundedReceiver<PagingEvent<BookMetadata>>,
    max_pages: u16,
) -> Result<()> {
    let mut pages = 0u16;
    let mut failure = None;

    fetcher.fetch_next();
    while let Some(event) = events.recv().await {
        match event {
            PagingEvent::Success(page) => {
                pages += 1;
                for book in &page {
                    println!("{}\n  {}", book.title, book.url);
                }
                if pages >= max_pages {
                    break;
                }
                fetcher.fetch_next();
            }
            PagingEvent::Error(error) => failure = Some(error),
            PagingEvent::Completed => break,
            PagingEvent::CompletedEmpty => {
                if failure.is_none() {
                    println!("No results.");
                }
                break;
            }
            PagingEvent::FetchingChanged(fetching) => {
                debug!(fetching, page = fetcher.page_index(), "fetching state changed");
            }
            PagingEvent::Reset => {}
        }
    }

    match failure {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

pub(super) async fn run_catalog(
    context: &AppContext,
    source_url: &str,
    search: Option<String>,
    max_pages: u16,
) -> Result<()> {
    let catalog = context
        .registry
        .resolve_catalog_source(source_url)
        .ok_or_else(|| anyhow!("No catalog source supports '{source_url}'"))?;

    let (fetcher, mut events) = match search {
        Some(query) => PagedFetcher::new(move |index| {
            let catalog = catalog.clone();
            let query = query.clone();
            async move { catalog.catalog_search(index, &query).await }
        }),
        None => PagedFetcher::new(move |index| {
            let catalog = catalog.clone();
            async move { catalog.catalog_list(index).await }
        }),
    };
    print_pages(&fetcher, &mut events, max_pages).await
}

pub(super) async fn run_search(
    context: &AppContext,
    database_id: &str,
    query: String,
    max_pages: u16,
) -> Result<()> {
    let database = context.database(database_id)?;
    let (fetcher, mut events) = PagedFetcher::new(move |index| {
        let database = database.clone();
        let query = query.clone();
        async move { database.search(index, &query).await }
    });
    print_pages(&fetcher, &mut events, max_pages).await
}

pub(super) async fn run_advanced(
    context: &AppContext,
    database_id: &str,
    include: Vec<String>,
    exclude: Vec<String>,
    max_pages: u16,
) -> Result<()> {
    let database = context.database(database_id)?;
    let (fetcher, mut events) = PagedFetcher::new(move |index| {
        let database = database.clone();
        let include = include.clone();
        let exclude = exclude.clone();
        async move { database.search_advanced(index, &include, &exclude).await }
    });
    print_pages(&fetcher, &mut events, max_pages).await
}

pub(super) async fn run_genres(context: &AppContext, database_id: &str, refresh: bool) -> Result<()> {
    let database = context.database(database_id)?;
    let cache = match &context.settings.genre_cache_dir {
        Some(dir) => GenreCache::with_dir(dir),
        None => GenreCache::new(),
    };
    if refresh {
        cache.invalidate(database.id());
    }

    let genres = cache.genres(database.as_ref()).await?;
    for (name, id) in &genres {
        println!("{id}\t{name}");
    }
    Ok(())
}

pub(super) fn run_sources(context: &AppContext) {
    println!("Sources:");
    for source in context.registry.sources() {
        let capability = if source.as_catalog().is_some() {
            "catalog"
        } else {
            "base"
        };
        println!(
            "  {:<20} {:<8} {}",
            source.id(),
            capability,
            source.base_url()
        );
    }
    println!("Databases:");
    for database in context.registry.databases() {
        println!("  {:<20} {:<8} {}", database.id(), "database", database.base_url());
    }
}
