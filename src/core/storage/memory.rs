use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ClientStorage;

/// In-process storage backend. Used by tests and by the CLI when no storage
/// file is configured.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose writes always fail, like a browser with storage quota
    /// exhausted or disabled.
    pub fn read_only() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            read_only: true,
        }
    }

    /// Seed a raw value, bypassing the read-only flag.
    pub async fn seed(&self, key: &str, value: &str) {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl ClientStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if self.read_only {
            anyhow::bail!("storage is read-only, refusing to write {key:?}");
        }
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        if self.read_only {
            anyhow::bail!("storage is read-only, refusing to remove {key:?}");
        }
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        let mut keys: Vec<String> = self.items.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_only_rejects_writes_but_serves_seeded_values() {
        let storage = MemoryStorage::read_only();
        storage.seed("k", "v").await;

        assert!(storage.set_item("k", "other").await.is_err());
        assert!(storage.remove_item("k").await.is_err());
        assert_eq!(storage.get_item("k").await.unwrap().as_deref(), Some("v"));
    }
}
