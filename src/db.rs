//! Database connection and schema management.
//!
//! `SQLite` pool with WAL mode for file databases and embedded migrations
//! creating the `book` and `chapter` tables.
//!
//! # Example
//!
//! ```no_run
//! use bookshelf_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("library.db")).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Pool size; `SQLite` locks at file level so more connections buy little.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits on a locked database before `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open or configure the database.
    #[error(
        "failed to open library database: {0}\n  Suggestion: Check that the database directory exists and is writable"
    )]
    Connection(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error(
        "failed to migrate library database: {0}\n  Suggestion: The file may belong to another program; point --database elsewhere"
    )]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Library database handle; cheap to clone, all clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the library at `db_path` in WAL mode and
    /// brings its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the file cannot be opened,
    /// or `DbError::Migration` if migrations fail.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    /// Creates an in-memory database for tests.
    ///
    /// The single connection is never recycled, since dropping it would drop
    /// the database with it.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("library schema up to date");
        Ok(Self { pool })
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns true if the journal mode is WAL.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the query fails.
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0.eq_ignore_ascii_case("wal"))
    }

    /// Closes all pooled connections.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_new_in_memory_creates_library_tables() {
        let db = Database::new_in_memory().await.unwrap();

        sqlx::query("INSERT INTO book (url, title) VALUES ('https://example.com/b', 'B')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO chapter (url, book_url, title, position) VALUES ('c1', 'https://example.com/b', 'One', 0)",
        )
        .execute(db.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_database_rejects_invalid_flag_values() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query("INSERT INTO book (url, title, completed) VALUES ('u', 't', 7)")
            .execute(db.pool())
            .await;

        assert!(result.is_err(), "CHECK constraint should reject completed = 7");
    }

    #[tokio::test]
    async fn test_database_file_uses_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::new(&temp_dir.path().join("library.db"))
            .await
            .unwrap();

        assert!(db.is_wal_enabled().await.unwrap());
        db.close().await;
    }

    #[tokio::test]
    async fn test_database_reopen_keeps_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("library.db");

        let db = Database::new(&path).await.unwrap();
        sqlx::query("INSERT INTO book (url, title) VALUES ('u', 't')")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;

        let db = Database::new(&path).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM book")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
