use sqlx::{
    Sqlite,
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous},
};
use tokio::sync::{RwLock, RwLockReadGuard};

use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};
use anyhow::Context;

pub(super) struct StorageState {
    db_file: Option<PathBuf>,
    pool: RwLock<SqlitePool>,
}

impl std::fmt::Debug for StorageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageState")
            .field("db_file", &self.db_file)
            .finish()
    }
}

impl StorageState {
    /// Acquire a pooled connection and hold the pool read lock for the entire lifetime
    /// of the returned guard.
    pub(super) async fn conn(&self) -> anyhow::Result<DbConnGuard<'_>> {
        let pool_guard = self.pool.read().await;

        // The connection must be acquired while the read lock is held so that
        // `close` cannot swap the pool out from under it.
        let conn = pool_guard.acquire().await?;

        Ok(DbConnGuard {
            _pool_guard: pool_guard,
            conn,
        })
    }

    /// Open (creating if needed) a storage file.
    pub(super) async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        let db_file = db_file.as_ref().to_path_buf();
        if let Some(parent) = db_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                anyhow::bail!("Storage file parent does not exist: {:?}", db_file);
            }
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(&db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open storage file {:?}", db_file))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(?db_file, "client storage opened");
        Ok(Self {
            db_file: Some(db_file),
            pool: RwLock::new(pool),
        })
    }

    /// Open a private in-memory database. A single connection is used because
    /// every sqlite in-memory connection is its own database.
    pub(super) async fn open_in_memory() -> anyhow::Result<Self> {
        let connect_opts = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            db_file: None,
            pool: RwLock::new(pool),
        })
    }

    /// Exclusive close:
    /// - waits for all in-flight queries (because it takes a WRITE lock)
    /// - checkpoints WAL so the storage file is current
    /// - closes the pool to release file handles
    pub(super) async fn close(&self) -> anyhow::Result<()> {
        let pool_guard = self.pool.write().await;
        if self.db_file.is_some() {
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
                .execute(&*pool_guard)
                .await?;
        }
        pool_guard.close().await;
        Ok(())
    }
}

pub struct DbConnGuard<'a> {
    _pool_guard: RwLockReadGuard<'a, SqlitePool>,
    conn: PoolConnection<Sqlite>,
}

impl<'a> Deref for DbConnGuard<'a> {
    type Target = PoolConnection<Sqlite>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for DbConnGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
