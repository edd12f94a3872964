//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Keep a library of serialized books in sync with their source sites.
///
/// Bookshelf browses site catalogs and book databases, downloads chapter
/// text, and tracks new chapters of the books in your library.
#[derive(Parser, Debug)]
#[command(name = "bookshelf")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/bookshelf/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Library database file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Per-request timeout in seconds (1-3600)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Browse or search a source's catalog
    Catalog {
        /// Any URL under the source's base URL
        source_url: String,
        /// Search the catalog instead of listing it
        #[arg(long)]
        search: Option<String>,
        #[command(flatten)]
        pages: PageArgs,
    },

    /// Search a book database by title
    Search {
        /// Database id (see `bookshelf sources`)
        #[arg(value_name = "DATABASE")]
        database_id: String,
        query: String,
        #[command(flatten)]
        pages: PageArgs,
    },

    /// List a book database's genres
    Genres {
        #[arg(value_name = "DATABASE")]
        database_id: String,
        /// Ignore the cached list
        #[arg(long)]
        refresh: bool,
    },

    /// Search a book database by genre
    Advanced {
        #[arg(value_name = "DATABASE")]
        database_id: String,
        /// Genre ids that must all be present
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,
        /// Genre ids that must be absent
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        #[command(flatten)]
        pages: PageArgs,
    },

    /// Show a book's database entry
    Book { url: String },

    /// Print a chapter's text
    Chapter { url: String },

    /// Add a book to the library
    Add {
        book_url: String,
        /// Title to store (defaults to the URL)
        #[arg(long)]
        title: Option<String>,
    },

    /// List library books
    List,

    /// List a book's chapters
    Chapters {
        book_url: String,
        /// Download the list even if chapters are stored
        #[arg(long)]
        refresh: bool,
    },

    /// Check library books for new chapters
    Update {
        /// Update completed books instead of ongoing ones
        #[arg(long)]
        completed: bool,
        /// Give up on a single book after this many seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
        item_timeout: Option<u64>,
    },

    /// List registered sources and databases
    Sources,
}

#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageArgs {
    /// Maximum number of pages to fetch (1-50)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=50))]
    pub pages: u16,
}
