//! Observable state of one library update batch.

use std::collections::HashSet;

use tokio::sync::watch;

use crate::library::{Book, ChapterMetadata};

/// Batch progress counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateProgress {
    /// Items finished so far, successful or not.
    pub updated: usize,
    /// Items in the batch.
    pub total: usize,
}

impl UpdateProgress {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.updated >= self.total
    }
}

/// A book whose remote list had chapters storage did not know about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewUpdate {
    pub book: Book,
    /// Newly discovered chapters, in remote list order.
    pub new_chapters: Vec<ChapterMetadata>,
}

/// Shared state mutated concurrently by the per-host workers.
///
/// Each collection sits behind a [`watch`] channel. Every mutation goes
/// through [`watch::Sender::send_modify`], which applies the change to the
/// current value under the channel's own lock, so concurrent workers never
/// lose updates. Observers subscribe to follow the batch live.
#[derive(Debug)]
pub struct UpdateState {
    progress: watch::Sender<UpdateProgress>,
    currently_processing: watch::Sender<HashSet<Book>>,
    new_updates: watch::Sender<HashSet<NewUpdate>>,
    failed_updates: watch::Sender<HashSet<Book>>,
}

impl Default for UpdateState {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: watch::Sender::new(UpdateProgress::default()),
            currently_processing: watch::Sender::new(HashSet::new()),
            new_updates: watch::Sender::new(HashSet::new()),
            failed_updates: watch::Sender::new(HashSet::new()),
        }
    }

    /// Clears all collections and sets the batch size.
    pub(crate) fn start_batch(&self, total: usize) {
        self.progress
            .send_replace(UpdateProgress { updated: 0, total });
        self.currently_processing.send_replace(HashSet::new());
        self.new_updates.send_replace(HashSet::new());
        self.failed_updates.send_replace(HashSet::new());
    }

    pub(crate) fn begin(&self, book: &Book) {
        self.currently_processing.send_modify(|processing| {
            processing.insert(book.clone());
        });
    }

    pub(crate) fn record_new(&self, update: NewUpdate) {
        self.new_updates.send_modify(|updates| {
            updates.insert(update);
        });
    }

    pub(crate) fn record_failure(&self, book: &Book) {
        self.failed_updates.send_modify(|failed| {
            failed.insert(book.clone());
        });
    }

    /// Removes `book` from the processing set and counts it as updated.
    pub(crate) fn finish(&self, book: &Book) {
        self.currently_processing.send_modify(|processing| {
            processing.remove(book);
        });
        self.progress.send_modify(|progress| progress.updated += 1);
    }

    #[must_use]
    pub fn progress(&self) -> UpdateProgress {
        *self.progress.borrow()
    }

    #[must_use]
    pub fn currently_processing(&self) -> HashSet<Book> {
        self.currently_processing.borrow().clone()
    }

    #[must_use]
    pub fn new_updates(&self) -> HashSet<NewUpdate> {
        self.new_updates.borrow().clone()
    }

    #[must_use]
    pub fn failed_updates(&self) -> HashSet<Book> {
        self.failed_updates.borrow().clone()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<UpdateProgress> {
        self.progress.subscribe()
    }

    pub fn subscribe_processing(&self) -> watch::Receiver<HashSet<Book>> {
        self.currently_processing.subscribe()
    }

    pub fn subscribe_new_updates(&self) -> watch::Receiver<HashSet<NewUpdate>> {
        self.new_updates.subscribe()
    }

    pub fn subscribe_failed(&self) -> watch::Receiver<HashSet<Book>> {
        self.failed_updates.subscribe()
    }
}
