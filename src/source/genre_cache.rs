//! Per-database cache of genre maps.
//!
//! Genre lists change rarely and are needed every time an advanced search is
//! built, so successful results are kept in memory and, when a directory is
//! configured, persisted as `<dir>/<database id>.genres.json`. Failures are
//! never cached.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::{debug, warn};

use super::{DatabaseSource, GenreMap};
use crate::outcome::Outcome;

/// Cache of [`DatabaseSource::search_genres`] results keyed by database id.
#[derive(Debug, Default)]
pub struct GenreCache {
    entries: DashMap<String, GenreMap>,
    dir: Option<PathBuf>,
}

impl GenreCache {
    /// Creates an in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache that also persists entries under `dir`.
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: DashMap::new(),
            dir: Some(dir.into()),
        }
    }

    /// Returns the cached genre map for `database`, fetching it on a miss.
    pub async fn genres(&self, database: &dyn DatabaseSource) -> Outcome<GenreMap> {
        let id = database.id();
        if let Some(hit) = self.entries.get(id) {
            debug!(database = id, "genre cache hit (memory)");
            return Ok(hit.clone());
        }
        if let Some(stored) = self.load(id) {
            debug!(database = id, "genre cache hit (disk)");
            self.entries.insert(id.to_string(), stored.clone());
            return Ok(stored);
        }

        let genres = database.search_genres().await?;
        self.store(id, &genres);
        self.entries.insert(id.to_string(), genres.clone());
        Ok(genres)
    }

    /// Drops the entry for `id` from memory and disk.
    pub fn invalidate(&self, id: &str) {
        self.entries.remove(id);
        let Some(path) = self.path_for(id) else {
            return;
        };
        match std::fs::remove_file(&path) {
            Err(error) if error.kind() != std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), error = %error, "failed to remove genre cache file");
            }
            _ => {}
        }
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        self.dir.as_deref().map(|dir| genre_file(dir, id))
    }

    fn load(&self, id: &str) -> Option<GenreMap> {
        let path = self.path_for(id)?;
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(genres) => Some(genres),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "ignoring unreadable genre cache file");
                None
            }
        }
    }

    fn store(&self, id: &str, genres: &GenreMap) {
        let Some(path) = self.path_for(id) else {
            return;
        };
        let result = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| {
                let json = serde_json::to_string_pretty(genres).map_err(std::io::Error::other)?;
                std::fs::write(&path, json)
            });
        if let Err(error) = result {
            warn!(path = %path.display(), error = %error, "failed to persist genre cache");
        }
    }
}

fn genre_file(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.genres.json"))
}
