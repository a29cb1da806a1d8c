use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{
    api::{ApiError, Country, PortalApi},
    cache::{DEFAULT_TTL, TtlCache},
    storage::ClientStorage,
};

pub const COUNTRIES_CACHE_KEY: &str = "cached_countries_v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryList {
    pub countries: Vec<Country>,
    pub count: usize,
}

/// Country list, served from a 24 hour cache when possible.
#[derive(Debug)]
pub struct CountryDirectory<S, A> {
    cache: TtlCache<S, CountryList>,
    api: Arc<A>,
}

impl<S: ClientStorage, A: PortalApi> CountryDirectory<S, A> {
    pub fn new(storage: Arc<S>, api: Arc<A>) -> Self {
        Self {
            cache: TtlCache::new(storage, COUNTRIES_CACHE_KEY, DEFAULT_TTL),
            api,
        }
    }

    pub async fn countries(&self) -> Result<Vec<Country>, ApiError> {
        if let Some(list) = self.cache.get().await {
            return Ok(list.countries);
        }
        let countries = self.api.countries().await?;
        let list = CountryList {
            count: countries.len(),
            countries: countries.clone(),
        };
        if let Err(e) = self.cache.put(list).await {
            tracing::warn!(error = %e, "failed to cache country list");
        }
        Ok(countries)
    }

    /// Case-insensitive match on name or ISO3 code.
    pub async fn search(&self, query: &str) -> Result<Vec<Country>, ApiError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .countries()
            .await?
            .into_iter()
            .filter(|c| {
                needle.is_empty()
                    || c.name.to_lowercase().contains(&needle)
                    || c.iso3.to_lowercase() == needle
            })
            .collect())
    }

    pub async fn invalidate(&self) {
        self.cache.clear().await
    }
}
