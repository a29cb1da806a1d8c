//! Debounced division search for the picker: only the last query typed within
//! the debounce window reaches the backend.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::core::{
    api::{ApiError, PortalApi},
    division::DivisionInput,
};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct DivisionSearch<A> {
    api: Arc<A>,
    delay: Duration,
    generation: AtomicU64,
}

impl<A: PortalApi> DivisionSearch<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self::with_delay(api, SEARCH_DEBOUNCE)
    }

    pub fn with_delay(api: Arc<A>, delay: Duration) -> Self {
        Self {
            api,
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// `Ok(None)` when a newer query arrived during the debounce window.
    pub async fn search(
        &self,
        query: &str,
        country: Option<&str>,
    ) -> Result<Option<Vec<DivisionInput>>, ApiError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();
        if query.is_empty() {
            return Ok(Some(Vec::new()));
        }
        tokio::time::sleep(self.delay).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::trace!(query, "search superseded");
            return Ok(None);
        }
        let results = self.api.search_divisions(query, country).await?;
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(None);
        }
        Ok(Some(results))
    }
}
