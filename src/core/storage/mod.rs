mod memory;
mod sqlite;
mod state;

use std::{future::Future, sync::Arc};

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// String-keyed durable storage, the same shape as a browser's local storage.
///
/// Every component that persists client state (current division, navigation
/// trace, cached lookups) goes through this trait so tests can swap in
/// [`MemoryStorage`].
pub trait ClientStorage {
    fn get_item(&self, key: &str) -> impl Future<Output = anyhow::Result<Option<String>>>;
    fn set_item(&self, key: &str, value: &str) -> impl Future<Output = anyhow::Result<()>>;
    fn remove_item(&self, key: &str) -> impl Future<Output = anyhow::Result<()>>;
    fn keys(&self) -> impl Future<Output = anyhow::Result<Vec<String>>>;
}

impl<S: ClientStorage> ClientStorage for Arc<S> {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        (**self).remove_item(key).await
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        (**self).keys().await
    }
}
