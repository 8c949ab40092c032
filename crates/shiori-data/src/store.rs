//! Connection management and migrations for the local database.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

use crate::error::{DataError, Result, map_query_err};

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "shiori.db";

/// Handle to the local `SQLite` database.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database inside `data_dir` and apply migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the database cannot
    /// be opened, or migrations fail.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|source| DataError::DataDir {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let path = database_path(data_dir);
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(map_query_err("database.open"))?;
        let database = Self { pool };
        database.run_migrations().await?;
        info!(path = %path.display(), "database ready");
        Ok(database)
    }

    /// Open a private in-memory database, used by tests and tooling.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or migrations fail.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(map_query_err("database.in_memory"))?;
        // A single long-lived connection keeps the in-memory database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(map_query_err("database.in_memory"))?;
        let database = Self { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Flush pending writes and close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|source| DataError::MigrationFailed { source })
    }
}

/// Location of the database file for a data directory.
#[must_use]
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_joins_file_name() {
        assert_eq!(
            database_path(Path::new("/var/lib/shiori")),
            PathBuf::from("/var/lib/shiori/shiori.db")
        );
    }

    #[tokio::test]
    async fn open_creates_directory_and_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let data_dir = temp.path().join("nested").join("data");
        let database = Database::open(&data_dir).await?;
        assert!(database_path(&data_dir).exists());
        database.close().await;
        Ok(())
    }
}
