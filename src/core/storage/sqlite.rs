use std::{path::Path, sync::Arc};

use sqlx::Row;

use super::{ClientStorage, state::StorageState};
use crate::core::clock;

/// Storage backed by a single sqlite `client_storage` table.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    state: Arc<StorageState>,
}

impl SqliteStorage {
    pub async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StorageState::open(db_file).await?),
        })
    }

    pub async fn in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StorageState::open_in_memory().await?),
        })
    }

    /// Flush and close the underlying pool. Any later access fails.
    pub async fn close(&self) -> anyhow::Result<()> {
        self.state.close().await
    }
}

impl ClientStorage for SqliteStorage {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.state.conn().await?;
        let value = sqlx::query(r#"SELECT value FROM client_storage WHERE key = $1"#)
            .bind(key)
            .fetch_optional(&mut **conn)
            .await?
            .map(|row| row.try_get::<String, _>("value"))
            .transpose()?;
        Ok(value)
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        let now = clock::now_millis();
        sqlx::query(
            r#"INSERT INTO client_storage (key, value, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&mut **conn)
        .await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM client_storage WHERE key = $1"#)
            .bind(key)
            .execute(&mut **conn)
            .await?;
        Ok(())
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"SELECT key FROM client_storage ORDER BY key ASC"#)
            .fetch_all(&mut **conn)
            .await?
            .into_iter()
            .map(|row| -> anyhow::Result<String> { Ok(row.try_get("key")?) })
            .collect()
    }
}
