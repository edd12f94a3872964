//! Library update orchestration.
//!
//! [`LibraryUpdater`] re-synchronizes the chapter lists of tracked books:
//!
//! 1. Books are partitioned by URL host.
//! 2. One task per host runs concurrently with the others.
//! 3. Within a host, books are processed strictly one after another, so a
//!    single site never sees concurrent requests from one batch.
//!
//! Per book, the stored chapter set and the remote chapter list are fetched
//! concurrently; the remote list is merged into storage only after both
//! finish, and the chapters whose URLs were not stored before are reported
//! as new. A failing book is recorded and never stops its host worker.
//!
//! Progress and results are published through [`UpdateState`] while the batch
//! runs; [`LibraryUpdater::update`] returns an [`UpdateSummary`] once every
//! worker has drained its list.

mod state;

pub use state::{NewUpdate, UpdateProgress, UpdateState};

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::content::ChapterListProvider;
use crate::library::{Book, ChapterMetadata, LibraryStore};
use crate::outcome::{Outcome, ScrapeError, SourceError, try_connect};

/// A book whose update failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpdate {
    pub book: Book,
    pub error: SourceError,
}

/// Result of a finished update batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Books in the batch.
    pub total: usize,
    /// Books processed, successful or not.
    pub updated: usize,
    /// Books with newly discovered chapters, ordered by book URL.
    pub new_chapters: Vec<NewUpdate>,
    /// Books whose update failed, ordered by book URL.
    pub failed: Vec<FailedUpdate>,
}

/// Host-partitioned library update orchestrator.
#[derive(Clone)]
pub struct LibraryUpdater {
    store: Arc<dyn LibraryStore>,
    provider: Arc<dyn ChapterListProvider>,
    item_timeout: Option<Duration>,
}

impl std::fmt::Debug for LibraryUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryUpdater")
            .field("item_timeout", &self.item_timeout)
            .finish_non_exhaustive()
    }
}

/// Host key of a book URL; `None` when the URL has no parsable host.
fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
}

/// Groups books by host, keeping each group in input order.
fn partition_by_host(books: Vec<Book>) -> BTreeMap<Option<String>, Vec<Book>> {
    let mut groups: BTreeMap<Option<String>, Vec<Book>> = BTreeMap::new();
    for book in books {
        groups.entry(host_of(&book.url)).or_default().push(book);
    }
    groups
}

impl LibraryUpdater {
    /// Creates an updater with no per-book time limit.
    #[must_use]
    pub fn new(store: Arc<dyn LibraryStore>, provider: Arc<dyn ChapterListProvider>) -> Self {
        Self {
            store,
            provider,
            item_timeout: None,
        }
    }

    /// Bounds the time spent on each book; an overrun is recorded as a
    /// `Timeout` failure and the worker moves on.
    #[must_use]
    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }

    /// Updates `books` and returns once every host worker has finished.
    ///
    /// `state` is reset at the start of the batch. Local books are skipped.
    #[instrument(skip(self, books, state), fields(books = books.len()))]
    pub async fn update(&self, books: Vec<Book>, state: Arc<UpdateState>) -> UpdateSummary {
        let books: Vec<Book> = books
            .into_iter()
            .filter(|book| {
                if book.is_local() {
                    debug!(url = %book.url, "skipping local book");
                }
                !book.is_local()
            })
            .collect();
        let total = books.len();
        state.start_batch(total);

        let groups = partition_by_host(books);
        info!(total, hosts = groups.len(), "starting library update");

        let mut handles = Vec::with_capacity(groups.len());
        for (host, books) in groups {
            let updater = self.clone();
            let state = Arc::clone(&state);
            handles.push(tokio::spawn(async move {
                updater.run_host(host, books, &state).await
            }));
        }

        let mut failed = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(host_failures) => failed.extend(host_failures),
                Err(e) => warn!(error = %e, "host worker panicked"),
            }
        }

        let mut new_chapters: Vec<NewUpdate> = state.new_updates().into_iter().collect();
        new_chapters.sort_by(|a, b| a.book.url.cmp(&b.book.url));
        failed.sort_by(|a, b| a.book.url.cmp(&b.book.url));

        let progress = state.progress();
        info!(
            total,
            updated = progress.updated,
            with_new_chapters = new_chapters.len(),
            failed = failed.len(),
            "library update complete"
        );

        UpdateSummary {
            total,
            updated: progress.updated,
            new_chapters,
            failed,
        }
    }

    /// Processes one host's books sequentially.
    #[instrument(skip(self, books, state), fields(host = host.as_deref().unwrap_or("<none>"), books = books.len()))]
    async fn run_host(
        &self,
        host: Option<String>,
        books: Vec<Book>,
        state: &UpdateState,
    ) -> Vec<FailedUpdate> {
        let mut failures = Vec::new();
        for book in books {
            state.begin(&book);
            match self.update_book_bounded(&book).await {
                Ok(new_chapters) if new_chapters.is_empty() => {
                    debug!(url = %book.url, "no new chapters");
                }
                Ok(new_chapters) => {
                    debug!(url = %book.url, count = new_chapters.len(), "new chapters found");
                    state.record_new(NewUpdate {
                        book: book.clone(),
                        new_chapters,
                    });
                }
                Err(error) => {
                    warn!(url = %book.url, kind = ?error.kind(), "book update failed");
                    state.record_failure(&book);
                    failures.push(FailedUpdate {
                        book: book.clone(),
                        error,
                    });
                }
            }
            state.finish(&book);
        }
        failures
    }

    async fn update_book_bounded(&self, book: &Book) -> Outcome<Vec<ChapterMetadata>> {
        let Some(limit) = self.item_timeout else {
            return self.update_book(book).await;
        };
        match tokio::time::timeout(limit, self.update_book(book)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SourceError::timeout(
                format!("book: {}", book.url),
                format!("update exceeded {}ms", limit.as_millis()),
            )),
        }
    }

    /// Fetches, merges and diffs one book's chapter list.
    async fn update_book(&self, book: &Book) -> Outcome<Vec<ChapterMetadata>> {
        try_connect(&format!("book: {}", book.url), || async {
            let (stored, remote) = tokio::join!(
                self.store.chapters(&book.url),
                self.provider.chapter_list(&book.url)
            );
            let remote = remote?;
            let stored = stored?;

            self.store.merge(&remote, &book.url).await?;

            let known: HashSet<&str> = stored.iter().map(|chapter| chapter.url.as_str()).collect();
            Ok::<_, ScrapeError>(
                remote
                    .into_iter()
                    .filter(|chapter| !known.contains(chapter.url.as_str()))
                    .collect(),
            )
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::db::Database;
    use crate::library::Library;
    use crate::outcome::SourceErrorKind;

    /// Provider answering from a script, tracking in-flight requests per host.
    #[derive(Default)]
    struct ScriptedProvider {
        lists: HashMap<String, Outcome<Vec<ChapterMetadata>>>,
        delay: Duration,
        in_flight: Mutex<HashMap<String, usize>>,
        max_per_host: AtomicUsize,
        in_flight_total: AtomicUsize,
        max_total: AtomicUsize,
        order: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn with(mut self, url: &str, list: Outcome<Vec<ChapterMetadata>>) -> Self {
            self.lists.insert(url.to_string(), list);
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl ChapterListProvider for ScriptedProvider {
        async fn chapter_list(&self, book_url: &str) -> Outcome<Vec<ChapterMetadata>> {
            let host = host_of(book_url).unwrap_or_default();
            {
                let mut in_flight = self.in_flight.lock().unwrap();
                let count = in_flight.entry(host.clone()).or_default();
                *count += 1;
                self.max_per_host.fetch_max(*count, Ordering::SeqCst);
            }
            let total = self.in_flight_total.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_total.fetch_max(total, Ordering::SeqCst);
            self.order.lock().unwrap().push(book_url.to_string());

            tokio::time::sleep(self.delay).await;

            self.in_flight_total.fetch_sub(1, Ordering::SeqCst);
            *self.in_flight.lock().unwrap().get_mut(&host).unwrap() -= 1;
            self.lists
                .get(book_url)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn chapters(book_url: &str, names: &[&str]) -> Vec<ChapterMetadata> {
        names
            .iter()
            .map(|name| ChapterMetadata::new(*name, format!("{book_url}/{name}")))
            .collect()
    }

    async fn library() -> Library {
        Library::new(Database::new_in_memory().await.unwrap())
    }

    fn updater(library: &Library, provider: ScriptedProvider) -> (LibraryUpdater, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let updater = LibraryUpdater::new(Arc::new(library.clone()), provider.clone());
        (updater, provider)
    }

    #[test]
    fn test_partition_by_host_keeps_order_and_groups_unparsable() {
        let books = vec![
            Book::new("https://a.example/1", "a1"),
            Book::new("https://b.example/1", "b1"),
            Book::new("https://a.example/2", "a2"),
            Book::new("not a url", "x"),
        ];
        let groups = partition_by_host(books);

        assert_eq!(groups.len(), 3);
        let a: Vec<_> = groups[&Some("a.example".to_string())]
            .iter()
            .map(|book| book.title.as_str())
            .collect();
        assert_eq!(a, ["a1", "a2"]);
        assert_eq!(groups[&None].len(), 1);
    }

    #[tokio::test]
    async fn test_three_hosts_two_books_each_counts_every_book() {
        let library = library().await;
        let books: Vec<Book> = ["a", "b", "c"]
            .iter()
            .flat_map(|host| {
                (1..=2).map(move |n| Book::new(format!("https://{host}.example/book{n}"), "t"))
            })
            .collect();
        let (updater, provider) = updater(
            &library,
            ScriptedProvider::default().delayed(Duration::from_millis(20)),
        );
        let state = Arc::new(UpdateState::new());

        let summary = updater.update(books, Arc::clone(&state)).await;

        assert_eq!(summary.total, 6);
        assert_eq!(summary.updated, 6);
        assert_eq!(state.progress(), UpdateProgress { updated: 6, total: 6 });
        assert!(state.currently_processing().is_empty());
        assert_eq!(provider.max_per_host.load(Ordering::SeqCst), 1);
        assert!(provider.max_total.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_books_on_one_host_run_in_input_order() {
        let library = library().await;
        let urls = ["https://a.example/3", "https://a.example/1", "https://a.example/2"];
        let books = urls.iter().map(|url| Book::new(*url, "t")).collect();
        let (updater, provider) = updater(&library, ScriptedProvider::default());

        updater.update(books, Arc::new(UpdateState::new())).await;

        assert_eq!(*provider.order.lock().unwrap(), urls);
    }

    #[tokio::test]
    async fn test_superset_reports_only_new_chapters_and_merges() {
        let library = library().await;
        let book = Book::new("https://a.example/novel", "Novel");
        library.add_book(&book).await.unwrap();
        library
            .merge(&chapters(&book.url, &["c0"]), &book.url)
            .await
            .unwrap();
        library
            .set_read(&[format!("{}/c0", book.url)], true)
            .await
            .unwrap();

        let remote = chapters(&book.url, &["c0", "c1", "c2"]);
        let (updater, _) = updater(
            &library,
            ScriptedProvider::default().with(&book.url, Ok(remote)),
        );
        let state = Arc::new(UpdateState::new());

        let summary = updater.update(vec![book.clone()], Arc::clone(&state)).await;

        let expected = NewUpdate {
            book: book.clone(),
            new_chapters: chapters(&book.url, &["c1", "c2"]),
        };
        assert_eq!(summary.new_chapters, [expected.clone()]);
        assert!(state.new_updates().contains(&expected));

        let stored = library.chapters(&book.url).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored[0].read, "read state survives the merge");
    }

    #[tokio::test]
    async fn test_unchanged_list_reports_nothing() {
        let library = library().await;
        let book = Book::new("https://a.example/novel", "Novel");
        let list = chapters(&book.url, &["c0", "c1"]);
        library.merge(&list, &book.url).await.unwrap();
        let (updater, _) = updater(&library, ScriptedProvider::default().with(&book.url, Ok(list)));

        let summary = updater.update(vec![book], Arc::new(UpdateState::new())).await;

        assert!(summary.new_chapters.is_empty());
        assert!(summary.failed.is_empty());
        assert_eq!(summary.updated, 1);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_from_siblings() {
        let library = library().await;
        let broken = Book::new("https://a.example/broken", "Broken");
        let after = Book::new("https://a.example/after", "After");
        let other = Book::new("https://b.example/ok", "Ok");
        let error = SourceError::unknown("book", "503 Service Unavailable", "");
        let provider = ScriptedProvider::default()
            .with(&broken.url, Err(error.clone()))
            .with(&after.url, Ok(chapters(&after.url, &["c1"])))
            .with(&other.url, Ok(chapters(&other.url, &["c1"])));
        let (updater, _) = updater(&library, provider);
        let state = Arc::new(UpdateState::new());

        let summary = updater
            .update(vec![broken.clone(), after.clone(), other.clone()], Arc::clone(&state))
            .await;

        assert_eq!(summary.updated, 3);
        assert_eq!(
            summary.failed,
            [FailedUpdate {
                book: broken.clone(),
                error
            }]
        );
        assert_eq!(state.failed_updates(), HashSet::from([broken.clone()]));
        let with_news: Vec<_> = summary.new_chapters.iter().map(|u| &u.book).collect();
        assert_eq!(with_news, [&after, &other]);
        assert!(!library.has_chapters(&broken.url).await.unwrap());
    }

    #[tokio::test]
    async fn test_item_timeout_records_timeout_failure() {
        let library = library().await;
        let slow = Book::new("https://slow.example/book", "Slow");
        let (updater, _) = updater(
            &library,
            ScriptedProvider::default().delayed(Duration::from_secs(30)),
        );
        let updater = updater.with_item_timeout(Duration::from_millis(50));

        let summary = updater.update(vec![slow.clone()], Arc::new(UpdateState::new())).await;

        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].error.kind(), SourceErrorKind::Timeout);
        assert_eq!(summary.updated, 1);
    }

    #[tokio::test]
    async fn test_local_books_are_skipped() {
        let library = library().await;
        let (updater, provider) = updater(&library, ScriptedProvider::default());

        let summary = updater
            .update(
                vec![Book::new("file:///home/me/book.epub", "Local")],
                Arc::new(UpdateState::new()),
            )
            .await;

        assert_eq!(summary.total, 0);
        assert!(provider.order.lock().unwrap().is_empty());
    }
}
