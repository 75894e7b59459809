//! SQLite persistence for listings and deletion requests.
//!
//! - [`ProductRepository`]: listing intake, moderation and sale state
//! - [`DeletionRequestRepository`]: owner requests and their resolution
//!
//! Every state transition that a capability link can trigger is a single
//! conditional statement, so concurrent or repeated redemptions cannot
//! corrupt a row.

mod deletion_requests;
mod products;

pub use deletion_requests::{
    DeletionRequest, DeletionRequestRepository, RequestOrigin, RequestStatus,
};
pub use products::{NewSubmission, Product, ProductRepository, ProductStatus, SaleStatus};

use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Path that selects a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("integrity check failed: {0}")]
    Integrity(String),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Shared handle to the listing database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Upper bound on waiting for a pooled connection.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Idle file connections are closed after this long.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (or create) the database at `path` and bring its schema up to date.
    ///
    /// `":memory:"` gives every call its own database, which lives as long as
    /// the returned handle.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let pool = if path == MEMORY_PATH {
            Self::open_memory().await?
        } else {
            Self::open_file(path).await?
        };
        info!(path = %path, "Database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations checked/applied");

        check_integrity(&pool).await?;
        Ok(Self { pool })
    }

    async fn open_memory() -> Result<SqlitePool, DbError> {
        // `file::memory:` is one database per process; parallel tests need
        // a distinct name each.
        let name = format!(
            "file:bazaar-memdb-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let options = SqliteConnectOptions::new()
            .filename(&name)
            .shared_cache(true)
            .create_if_missing(true);

        // The database is dropped when its last connection closes, so one
        // connection is pinned open.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    async fn open_file(path: &str) -> Result<SqlitePool, DbError> {
        if let Some(dir) = Path::new(path).parent()
            && !dir.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(dir)
        {
            warn!(path = %dir.display(), error = %e, "Failed to create database directory");
        }

        // WAL lets catalog reads proceed while a moderation write is in flight
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Some(Self::IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    /// Get product repository.
    pub fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.pool)
    }

    /// Get deletion request repository.
    pub fn deletion_requests(&self) -> DeletionRequestRepository<'_> {
        DeletionRequestRepository::new(&self.pool)
    }
}

/// Refuse to serve from a database SQLite reports as damaged.
async fn check_integrity(pool: &SqlitePool) -> Result<(), DbError> {
    let verdict: String = sqlx::query_scalar("PRAGMA integrity_check")
        .fetch_one(pool)
        .await?;
    if verdict != "ok" {
        tracing::error!(integrity_check = %verdict, "Database integrity check FAILED");
        return Err(DbError::Integrity(verdict));
    }
    info!("Database integrity check passed");
    Ok(())
}
