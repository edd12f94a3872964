//! Paginated incremental fetching for catalog browsing and search.
//!
//! [`PagedFetcher`] is a small state machine over a page-fetch function:
//!
//! ```text
//! Idle --fetch_next--> Loading --non-empty page--> Idle
//!                              --empty page / error--> Consumed
//! any --reset--> Idle (page 0, generation + 1)
//! ```
//!
//! Results are published as [`PagingEvent`]s on an unbounded channel. Every
//! attempt remembers the generation it started in; a [`reset`](PagedFetcher::reset)
//! bumps the generation so a result still in flight is dropped instead of
//! published.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::outcome::{Outcome, SourceError, panic_message};

/// Page-fetch function: page index in, one page of results out.
pub type PageFetchFn<T> = Arc<dyn Fn(usize) -> BoxFuture<'static, Outcome<Vec<T>>> + Send + Sync>;

/// Iterator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready to fetch the next page.
    Idle,
    /// A page request is in flight.
    Loading,
    /// An empty page or an error ended the listing.
    Consumed,
}

/// Notification published by a [`PagedFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagingEvent<T> {
    /// A non-empty page arrived.
    Success(Vec<T>),
    /// The listing ended after at least one item.
    Completed,
    /// The listing ended without producing any item.
    CompletedEmpty,
    /// The page request failed; a completion event follows.
    Error(SourceError),
    /// A request started (`true`) or its result was published or abandoned (`false`).
    FetchingChanged(bool),
    /// The iterator went back to page 0.
    Reset,
}

struct State<T> {
    phase: Phase,
    page_index: usize,
    accumulated_count: usize,
    generation: u64,
    fetch: PageFetchFn<T>,
    task: Option<JoinHandle<()>>,
}

impl<T> State<T> {
    fn completion(&self) -> PagingEvent<T> {
        if self.accumulated_count == 0 {
            PagingEvent::CompletedEmpty
        } else {
            PagingEvent::Completed
        }
    }
}

fn panicked_page(index: usize, payload: &(dyn std::any::Any + Send)) -> SourceError {
    let message = panic_message(payload);
    warn!(page = index, %message, "page fetch panicked");
    SourceError::unknown(format!("page: {}", index + 1), message, String::new())
}

struct Shared<T> {
    state: Mutex<State<T>>,
    events: mpsc::UnboundedSender<PagingEvent<T>>,
}

impl<T: Send + 'static> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Callers hold the state lock so events from one generation never
    // interleave with a concurrent reset.
    fn emit(&self, event: PagingEvent<T>) {
        if self.events.send(event).is_err() {
            trace!("paging event dropped, no listener");
        }
    }

    fn publish(&self, generation: u64, outcome: Outcome<Vec<T>>) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                generation,
                current = state.generation,
                "dropping stale page result"
            );
            return;
        }

        state.task = None;
        state.page_index += 1;
        self.emit(PagingEvent::FetchingChanged(false));

        match outcome {
            Ok(page) if page.is_empty() => {
                state.phase = Phase::Consumed;
                self.emit(state.completion());
            }
            Ok(page) => {
                state.phase = Phase::Idle;
                state.accumulated_count += page.len();
                self.emit(PagingEvent::Success(page));
            }
            Err(error) => {
                debug!(page = state.page_index - 1, error = %error, "page request failed, ending listing");
                state.phase = Phase::Consumed;
                self.emit(PagingEvent::Error(error));
                self.emit(state.completion());
            }
        }
    }
}

/// Restartable, cancellable page iterator.
///
/// At most one page request is in flight per instance. Requests run on the
/// ambient tokio runtime, so [`fetch_next`](Self::fetch_next) must be called
/// from within one.
pub struct PagedFetcher<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> PagedFetcher<T> {
    /// Creates an idle iterator and the receiving end of its event stream.
    pub fn new<F, Fut>(fetch: F) -> (Self, mpsc::UnboundedReceiver<PagingEvent<T>>)
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<Vec<T>>> + Send + 'static,
    {
        let (events, receiver) = mpsc::unbounded_channel();
        let state = State {
            phase: Phase::Idle,
            page_index: 0,
            accumulated_count: 0,
            generation: 0,
            fetch: boxed_fetch(fetch),
            task: None,
        };
        let fetcher = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                events,
            }),
        };
        (fetcher, receiver)
    }

    /// Requests the next page. Does nothing unless the iterator is idle.
    ///
    /// The page-fetch function runs without the state lock held, so it may
    /// call back into this fetcher. A panic while building or awaiting the
    /// page is published as a [`SourceError::Unknown`] error.
    pub fn fetch_next(&self) {
        let (generation, index, fetch) = {
            let mut state = self.shared.lock();
            if state.phase != Phase::Idle {
                return;
            }
            state.phase = Phase::Loading;
            self.shared.emit(PagingEvent::FetchingChanged(true));
            (state.generation, state.page_index, Arc::clone(&state.fetch))
        };
        debug!(page = index, generation, "fetching page");

        let request = match panic::catch_unwind(AssertUnwindSafe(|| fetch(index))) {
            Ok(request) => request,
            Err(payload) => {
                self.shared
                    .publish(generation, Err(panicked_page(index, payload.as_ref())));
                return;
            }
        };

        let mut state = self.shared.lock();
        if state.generation != generation {
            debug!(generation, current = state.generation, "reset before page request started");
            return;
        }
        let shared = Arc::clone(&self.shared);
        // The task cannot publish before its handle is stored: publish takes this lock.
        state.task = Some(tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(request).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => Err(panicked_page(index, payload.as_ref())),
            };
            shared.publish(generation, outcome);
        }));
    }

    /// Calls [`fetch_next`](Self::fetch_next) when idle and `predicate` holds.
    ///
    /// `predicate` is only evaluated while idle.
    pub fn fetch_trigger(&self, predicate: impl FnOnce() -> bool) {
        if self.phase() == Phase::Idle && predicate() {
            self.fetch_next();
        }
    }

    /// Returns to page 0 and invalidates any request still in flight.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
        if state.phase == Phase::Loading {
            self.shared.emit(PagingEvent::FetchingChanged(false));
        }
        state.phase = Phase::Idle;
        state.page_index = 0;
        state.accumulated_count = 0;
        self.shared.emit(PagingEvent::Reset);
        debug!(generation = state.generation, "paging reset");
    }

    /// Swaps the page-fetch function without resetting.
    pub fn set_fetch_fn<F, Fut>(&self, fetch: F)
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<Vec<T>>> + Send + 'static,
    {
        self.shared.lock().fetch = boxed_fetch(fetch);
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// Index of the next page to request.
    #[must_use]
    pub fn page_index(&self) -> usize {
        self.shared.lock().page_index
    }

    /// Items received since the last reset.
    #[must_use]
    pub fn accumulated_count(&self) -> usize {
        self.shared.lock().accumulated_count
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }
}

impl<T> Drop for PagedFetcher<T> {
    fn drop(&mut self) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }
}

impl<T> std::fmt::Debug for PagedFetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("PagedFetcher")
            .field("phase", &state.phase)
            .field("page_index", &state.page_index)
            .field("accumulated_count", &state.accumulated_count)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

fn boxed_fetch<T, F, Fut>(fetch: F) -> PageFetchFn<T>
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<Vec<T>>> + Send + 'static,
{
    Arc::new(move |index| fetch(index).boxed())
}
