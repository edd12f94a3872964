//! Library update handler with a progress bar.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bookshelf_core::{LibraryUpdater, UpdateState, UpdateSummary};
use indicatif::{ProgressBar, ProgressStyle};

use super::{AppContext, short_reason};

fn progress_bar(total: usize) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Mirrors batch progress onto `bar` until aborted.
fn spawn_progress_ui(state: Arc<UpdateState>, bar: ProgressBar) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress = state.subscribe_progress();
        let mut processing = state.subscribe_processing();
        loop {
            tokio::select! {
                changed = progress.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *progress.borrow_and_update();
                    bar.set_length(current.total as u64);
                    bar.set_position(current.updated as u64);
                }
                changed = processing.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let titles: Vec<String> = processing
                        .borrow_and_update()
                        .iter()
                        .map(|book| book.title.clone())
                        .collect();
                    bar.set_message(titles.join(", "));
                }
            }
        }
    })
}

fn print_summary(summary: &UpdateSummary) {
    println!("Updated {}/{} books.", summary.updated, summary.total);

    if !summary.new_chapters.is_empty() {
        println!("\nNew chapters:");
        for update in &summary.new_chapters {
            println!("  {} ({} new)", update.book.title, update.new_chapters.len());
            for chapter in &update.new_chapters {
                println!("    - {}", chapter.title);
            }
        }
    }

    if !summary.failed.is_empty() {
        println!("\nFailed:");
        for failed in &summary.failed {
            println!("  {}: {}", failed.book.title, short_reason(&failed.error));
        }
    }
}

pub(super) async fn run_update(
    context: &AppContext,
    completed: bool,
    item_timeout: Option<u64>,
) -> Result<()> {
    let library = context.library().await?;
    let books = library.books_for_update(completed).await?;
    if books.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    let mut updater = LibraryUpdater::new(Arc::new(library), Arc::new(context.content()));
    if let Some(secs) = item_timeout {
        updater = updater.with_item_timeout(Duration::from_secs(secs));
    }

    let state = Arc::new(UpdateState::new());
    let bar = progress_bar(books.len());
    let ui = spawn_progress_ui(Arc::clone(&state), bar.clone());

    let summary = updater.update(books, Arc::clone(&state)).await;

    ui.abort();
    bar.finish_and_clear();
    print_summary(&summary);
    Ok(())
}
