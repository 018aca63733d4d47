use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod catalog_repo;
mod mapping;
mod migrate;
mod note_repo;
mod preferences_repo;
mod question_repo;
mod quiz_repo;
mod student_repo;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("schema migration {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
}

/// `mode=memory` databases vanish once their last connection closes.
fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// In-memory URLs keep one connection open for the life of the pool.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or a
    /// connection PRAGMA fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let min_connections = u32::from(is_memory_url(database_url));
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        if !is_memory_url(database_url) {
            sqlx::query("PRAGMA journal_mode = WAL;")
                .execute(&pool)
                .await?;
        }
        Ok(Self { pool })
    }

    /// Open a named shared-cache in-memory database with the schema applied.
    ///
    /// Repositories opened with the same `name` in one process see the same data.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn in_memory(name: &str) -> Result<Self, SqliteInitError> {
        let repo = Self::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared")).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending schema versions.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// Highest applied schema version. Call after `migrate`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the version table cannot be read.
    pub async fn schema_version(&self) -> Result<i64, SqliteInitError> {
        migrate::current_version(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`, migrated to the latest schema.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self::from_repository(repo))
    }
}
