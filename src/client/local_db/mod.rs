//! # Local Database Module
//!
//! Durable client-side storage backed by SQLite. The forum client only needs
//! a small key/value table (the active session lives there), but the store
//! keeps the same migration bookkeeping as any other local schema so it can
//! grow without breaking existing files.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use maternal_forum::client::local_db::LocalStore;
//!
//! # async fn example() -> maternal_forum::shared::Result<()> {
//! let store = LocalStore::open(std::path::Path::new("/tmp/forum")).await?;
//! store.put("session", "{}").await?;
//! let value = store.get("session").await?;
//! # Ok(())
//! # }
//! ```

pub mod schema;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::shared::error::{ForumError, Result};

/// File name of the local database inside the data directory
pub const DB_FILE_NAME: &str = "local.db";

/// Local database connection manager
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open or create the local database inside `dir`.
    ///
    /// Creates the directory and file if needed, enables WAL mode and
    /// applies pending migrations.
    pub async fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            tracing::error!("Failed to create data directory {}: {:?}", dir.display(), e);
            ForumError::server(None, format!("Failed to create data directory: {}", e))
        })?;

        let path = dir.join(DB_FILE_NAME);
        tracing::debug!("Opening local database at {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open a private in-memory database; nothing survives the process
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // A single long-lived connection, otherwise each connection would see
        // its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(schema::CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        let (current_version,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        for version in schema::get_pending_migrations(current_version) {
            self.apply_migration(version).await?;
        }

        Ok(())
    }

    async fn apply_migration(&self, version: i64) -> Result<()> {
        tracing::info!("Applying local schema migration {}", version);
        let mut tx = self.pool.begin().await?;

        if version == 1 {
            sqlx::query(schema::CREATE_KV_TABLE).execute(&mut *tx).await?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Read a value
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    /// Insert or overwrite a value
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a value; missing keys are not an error
    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
