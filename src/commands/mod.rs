//! CLI command handlers.

mod browse;
mod library;
mod update;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use bookshelf_core::{
    AdapterRegistry, ContentService, Database, DatabaseSource, HttpFetcher, Library, SourceError,
    build_default_registry,
};
use tracing::debug;

use crate::app_config::Settings;
use crate::cli::Command;

/// Shared handles built once per invocation.
pub(crate) struct AppContext {
    settings: Settings,
    fetcher: HttpFetcher,
    registry: Arc<AdapterRegistry>,
}

impl AppContext {
    pub(crate) fn new(settings: Settings) -> Result<Self> {
        let fetcher = HttpFetcher::with_timeouts(settings.connect_timeout, settings.request_timeout)
            .context("Failed to build HTTP client")?;
        let registry = Arc::new(build_default_registry(&fetcher));
        Ok(Self {
            settings,
            fetcher,
            registry,
        })
    }

    fn content(&self) -> ContentService {
        ContentService::new(self.fetcher.clone(), Arc::clone(&self.registry))
    }

    fn database(&self, id: &str) -> Result<Arc<dyn DatabaseSource>> {
        self.registry.database(id).ok_or_else(|| {
            let known: Vec<_> = self.registry.databases().iter().map(|db| db.id()).collect();
            anyhow!("Unknown database '{id}'. Known databases: {}", known.join(", "))
        })
    }

    /// Opens the library database, creating its directory if needed.
    async fn library(&self) -> Result<Library> {
        let path = &self.settings.database_path;
        ensure_parent_dir(path)?;
        debug!(path = %path.display(), "opening library database");
        let db = Database::new(path)
            .await
            .with_context(|| format!("Failed to open library database '{}'", path.display()))?;
        Ok(Library::new(db))
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display())),
        _ => Ok(()),
    }
}

/// One-line reason for a failed operation, for list output.
pub(crate) fn short_reason(error: &SourceError) -> String {
    match error {
        SourceError::Timeout { message, .. } => format!("timeout: {message}"),
        SourceError::UnsupportedSource { .. } => "source not supported".to_string(),
        SourceError::Unknown { message, .. } => message.clone(),
    }
}

pub(crate) async fn run(command: Command, context: &AppContext) -> Result<()> {
    match command {
        Command::Catalog {
            source_url,
            search,
            pages,
        } => browse::run_catalog(context, &source_url, search, pages.pages).await,
        Command::Search {
            database_id,
            query,
            pages,
        } => browse::run_search(context, &database_id, query, pages.pages).await,
        Command::Genres {
            database_id,
            refresh,
        } => browse::run_genres(context, &database_id, refresh).await,
        Command::Advanced {
            database_id,
            include,
            exclude,
            pages,
        } => browse::run_advanced(context, &database_id, include, exclude, pages.pages).await,
        Command::Sources => {
            browse::run_sources(context);
            Ok(())
        }
        Command::Book { url } => library::run_book(context, &url).await,
        Command::Chapter { url } => library::run_chapter(context, &url).await,
        Command::Add { book_url, title } => library::run_add(context, &book_url, title).await,
        Command::List => library::run_list(context).await,
        Command::Chapters { book_url, refresh } => {
            library::run_chapters(context, &book_url, refresh).await
        }
        Command::Update {
            completed,
            item_timeout,
        } => update::run_update(context, completed, item_timeout).await,
    }
}
