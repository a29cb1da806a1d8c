//! IP-derived location guess for anonymous sessions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{
    api::{ApiError, PortalApi},
    cache::{DEFAULT_TTL, TtlCache},
    division::{CountryField, DivisionInput, opaque_id_opt},
    storage::ClientStorage,
};

pub const ANONYMOUS_LOCATION_KEY: &str = "anonymousLocation";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpLocation {
    #[serde(default, deserialize_with = "opaque_id_opt")]
    pub administrative_division_id: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousLocation {
    #[serde(default)]
    pub country: Option<CountryField>,
    #[serde(default)]
    pub location: Option<IpLocation>,
    #[serde(default, rename = "closestDivisions")]
    pub closest_divisions: Vec<DivisionInput>,
}

impl AnonymousLocation {
    pub fn division_id(&self) -> Option<&str> {
        self.location
            .as_ref()?
            .administrative_division_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

/// Anonymous location cache with a 24 hour freshness window. Cleared as soon
/// as a user authenticates.
#[derive(Debug)]
pub struct LocationStore<S> {
    cache: TtlCache<S, AnonymousLocation>,
}

impl<S> Clone for LocationStore<S> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<S: ClientStorage> LocationStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            cache: TtlCache::new(storage, ANONYMOUS_LOCATION_KEY, DEFAULT_TTL),
        }
    }

    pub fn cache(&self) -> &TtlCache<S, AnonymousLocation> {
        &self.cache
    }

    pub async fn get(&self) -> Option<AnonymousLocation> {
        self.cache.get().await
    }

    pub async fn save(&self, location: AnonymousLocation) -> anyhow::Result<()> {
        self.cache.put(location).await
    }

    pub async fn clear(&self) {
        self.cache.clear().await
    }

    /// Cached location if fresh, otherwise a new geolocation lookup.
    pub async fn locate<A: PortalApi>(&self, api: &A) -> Result<AnonymousLocation, ApiError> {
        if let Some(location) = self.get().await {
            return Ok(location);
        }
        let location = api.geolocate_ip().await?;
        if let Err(e) = self.save(location.clone()).await {
            tracing::warn!(error = %e, "failed to cache anonymous location");
        }
        Ok(location)
    }
}
