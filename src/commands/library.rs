//! Library and content handlers.

use anyhow::Result;
use bookshelf_core::Book;

use super::AppContext;

pub(super) async fn run_chapter(context: &AppContext, url: &str) -> Result<()> {
    let text = context.content().download_chapter_content(url).await?;
    println!("{text}");
    Ok(())
}

pub(super) async fn run_book(context: &AppContext, url: &str) -> Result<()> {
    let data = context.content().download_book_data(url).await?;

    println!("{}", data.title);
    if !data.book_type.is_empty() {
        println!("Type: {}", data.book_type);
    }
    if !data.authors.is_empty() {
        let authors: Vec<_> = data.authors.iter().map(|a| a.name.as_str()).collect();
        println!("Authors: {}", authors.join(", "));
    }
    if !data.alternative_titles.is_empty() {
        println!("Also known as: {}", data.alternative_titles.join(" / "));
    }
    if !data.genres.is_empty() {
        println!("Genres: {}", data.genres.join(", "));
    }
    if !data.tags.is_empty() {
        println!("Tags: {}", data.tags.join(", "));
    }
    if !data.description.is_empty() {
        println!("\n{}", data.description);
    }
    for (heading, books) in [
        ("Related", &data.related_books),
        ("Recommended", &data.similar_recommended),
    ] {
        if books.is_empty() {
            continue;
        }
        println!("\n{heading}:");
        for book in books {
            println!("  {}\n    {}", book.title, book.url);
        }
    }
    Ok(())
}

pub(super) async fn run_add(context: &AppContext, book_url: &str, title: Option<String>) -> Result<()> {
    let library = context.library().await?;
    let title = title.unwrap_or_else(|| book_url.to_string());
    library.add_book(&Book::new(book_url, &title)).await?;
    println!("Added '{title}'.");
    Ok(())
}

pub(super) async fn run_list(context: &AppContext) -> Result<()> {
    let library = context.library().await?;
    let books = library.library_books().await?;
    if books.is_empty() {
        println!("Library is empty.");
        return Ok(());
    }
    for book in books {
        let marker = if book.completed { "done" } else { "    " };
        println!("[{marker}] {}\n       {}", book.title, book.url);
    }
    Ok(())
}

pub(super) async fn run_chapters(context: &AppContext, book_url: &str, refresh: bool) -> Result<()> {
    let library = context.library().await?;
    let chapters = context
        .content()
        .fetch_chapter_list(&library, book_url, !refresh)
        .await?;
    for chapter in chapters {
        let read = if chapter.read { "x" } else { " " };
        println!("{:>5} [{read}] {}", chapter.position + 1, chapter.title);
    }
    Ok(())
}
