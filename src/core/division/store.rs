use std::sync::Arc;

use crate::core::{clock, storage::ClientStorage};

use super::{Division, DivisionInput};

pub const CURRENT_DIVISION_KEY: &str = "currentActiveDivision";

/// Single source of truth for the division currently being viewed.
///
/// Reads never fail: a corrupt record is deleted and reported as absent.
/// Writes are best effort: a failed persist is logged and the normalized
/// record is still handed back.
#[derive(Debug)]
pub struct DivisionStore<S> {
    storage: Arc<S>,
}

impl<S> Clone for DivisionStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<S: ClientStorage> DivisionStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn get_current(&self) -> Option<Division> {
        let raw = match self.storage.get_item(CURRENT_DIVISION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read current division");
                return None;
            }
        };
        match serde_json::from_str::<Division>(&raw) {
            Ok(division) => Some(division),
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt current division record");
                if let Err(e) = self.storage.remove_item(CURRENT_DIVISION_KEY).await {
                    tracing::warn!(error = %e, "failed to remove corrupt current division record");
                }
                None
            }
        }
    }

    pub async fn set_current(&self, input: DivisionInput) -> Division {
        self.set_current_at(input, clock::now_millis()).await
    }

    pub async fn set_current_at(&self, input: DivisionInput, timestamp: i64) -> Division {
        let division = Division::from_input(input, timestamp);
        self.set_current_record(&division).await;
        division
    }

    /// Persist an already normalized record, best effort.
    pub async fn set_current_record(&self, division: &Division) {
        if let Err(e) = self.persist(division).await {
            tracing::warn!(division_id = %division.id, error = %e, "failed to persist current division");
        } else {
            tracing::debug!(division_id = %division.id, slug = %division.slug, "current division stored");
        }
    }

    async fn persist(&self, division: &Division) -> anyhow::Result<()> {
        let json = serde_json::to_string(division)?;
        self.storage.set_item(CURRENT_DIVISION_KEY, &json).await
    }

    pub async fn clear_current(&self) {
        if let Err(e) = self.storage.remove_item(CURRENT_DIVISION_KEY).await {
            tracing::warn!(error = %e, "failed to clear current division");
        }
    }

    pub async fn is_current(&self, id: &str) -> bool {
        self.get_current().await.is_some_and(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStorage;

    #[tokio::test]
    async fn test_set_then_get_round_trips_identity_fields() {
        let store = DivisionStore::new(Arc::new(MemoryStorage::new()));
        let written = store
            .set_current(DivisionInput::new("d1", "Sherbrooke").with_country("CAN"))
            .await;
        let read = store.get_current().await.unwrap();

        assert_eq!(read.id, written.id);
        assert_eq!(read.name, "Sherbrooke");
        assert_eq!(read.slug, "sherbrooke");
        assert_eq!(read.country.as_deref(), Some("CAN"));
        assert!(store.is_current("d1").await);
        assert!(!store.is_current("d2").await);
    }

    #[tokio::test]
    async fn test_write_fully_replaces_previous_record() {
        let store = DivisionStore::new(Arc::new(MemoryStorage::new()));
        let mut first = DivisionInput::new("d1", "Sherbrooke").with_country("CAN");
        first.boundary_type = Some("municipality".into());
        store.set_current(first).await;
        store.set_current(DivisionInput::new("d2", "Cotonou")).await;

        let read = store.get_current().await.unwrap();
        assert_eq!(read.id, "d2");
        assert_eq!(read.country, None);
        assert_eq!(read.boundary_type, None);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_removed() {
        let storage = Arc::new(MemoryStorage::new());
        storage.seed(CURRENT_DIVISION_KEY, "{not json").await;
        let store = DivisionStore::new(storage.clone());

        assert_eq!(store.get_current().await, None);
        assert_eq!(storage.get_item(CURRENT_DIVISION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_with_numeric_id_is_kept() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .seed(
                CURRENT_DIVISION_KEY,
                r#"{"id":42,"name":"Sherbrooke","slug":"sherbrooke","country":"CAN","parent":null,"admin_level":null,"boundary_type":null,"level_1_id":3,"timestamp":1700000000000}"#,
            )
            .await;
        let store = DivisionStore::new(storage.clone());

        let division = store.get_current().await.unwrap();
        assert_eq!(division.id, "42");
        assert_eq!(division.level_1_id.as_deref(), Some("3"));
        assert!(store.is_current("42").await);
        assert!(storage.get_item(CURRENT_DIVISION_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_write_still_returns_normalized_record() {
        let store = DivisionStore::new(Arc::new(MemoryStorage::read_only()));
        let division = store
            .set_current(DivisionInput::new("d1", "Lévis").with_country("can"))
            .await;

        assert_eq!(division.slug, "levis");
        assert_eq!(division.country.as_deref(), Some("CAN"));
        assert_eq!(store.get_current().await, None);
    }

    #[tokio::test]
    async fn test_clear_current() {
        let store = DivisionStore::new(Arc::new(MemoryStorage::new()));
        store.set_current(DivisionInput::new("d1", "Magog")).await;
        store.clear_current().await;
        assert_eq!(store.get_current().await, None);
    }
}
