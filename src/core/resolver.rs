//! Fallback division for sessions with no explicit division in context:
//! login, an invalid or missing division URL, direct dashboard access.
//!
//! Tiers are consulted in order and the first `Ok` wins:
//! 1. the stored current division (needs both slug and country)
//! 2. the authenticated user's profile division
//! 3. the cached anonymous IP location
//! 4. the configured default division
//!
//! A failing tier never surfaces to the caller; [`DivisionResolver::resolve_traced`]
//! keeps the per-tier errors for inspection.

use std::{collections::BTreeSet, fmt, sync::Arc};

use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::{
    api::{ApiError, PortalApi, User},
    division::{Division, DivisionStore, is_table_url_path, slugify, url_path_for_country},
    location::LocationStore,
    route::DivisionRoute,
    storage::ClientStorage,
};

/// Path segment used when neither the fixed table nor the backend knows the
/// country.
pub const GENERIC_URL_PATH: &str = "division";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    StoredDivision,
    UserProfile,
    AnonymousLocation,
    Fallback,
}

impl Tier {
    pub const CASCADE: [Tier; 4] = [
        Tier::StoredDivision,
        Tier::UserProfile,
        Tier::AnonymousLocation,
        Tier::Fallback,
    ];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::StoredDivision => "stored division",
            Tier::UserProfile => "user profile",
            Tier::AnonymousLocation => "anonymous location",
            Tier::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("no division stored")]
    NoStoredDivision,

    #[error("stored division {id} has no slug or country")]
    IncompleteStoredDivision { id: String },

    #[error("no authenticated user")]
    NoUser,

    #[error("user {user_id} has no profile division")]
    NoProfileDivision { user_id: String },

    #[error("no fresh anonymous location")]
    NoAnonymousLocation,

    #[error("anonymous location has no administrative division")]
    NoLocationDivision,

    #[error("failed to fetch division {id}")]
    Fetch {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("division {id} has no usable slug")]
    NoSlug { id: String },
}

/// Where to send a session when every other tier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackDivision {
    pub url_path: String,
    pub slug: String,
}

impl Default for FallbackDivision {
    fn default() -> Self {
        Self {
            url_path: "municipality".to_string(),
            slug: "montreal".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Resolution {
    pub route: DivisionRoute,
    pub tier: Tier,
    /// Tiers that were tried before `tier` and why they failed.
    pub skipped: Vec<(Tier, ResolutionError)>,
}

#[derive(Debug)]
pub struct DivisionResolver<S, A> {
    store: DivisionStore<S>,
    locations: LocationStore<S>,
    api: Arc<A>,
    fallback: FallbackDivision,
    /// Admin paths the backend handed out for countries outside the table.
    learned_paths: Arc<RwLock<BTreeSet<String>>>,
}

impl<S, A> Clone for DivisionResolver<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            locations: self.locations.clone(),
            api: self.api.clone(),
            fallback: self.fallback.clone(),
            learned_paths: self.learned_paths.clone(),
        }
    }
}

impl<S: ClientStorage, A: PortalApi> DivisionResolver<S, A> {
    pub fn new(storage: Arc<S>, api: Arc<A>, fallback: FallbackDivision) -> Self {
        Self {
            store: DivisionStore::new(storage.clone()),
            locations: LocationStore::new(storage),
            api,
            fallback,
            learned_paths: Arc::default(),
        }
    }

    /// Navigable URL of the default division. Never fails.
    pub async fn resolve(&self, user: Option<&User>) -> String {
        self.resolve_traced(user).await.route.to_url()
    }

    pub async fn resolve_traced(&self, user: Option<&User>) -> Resolution {
        let mut skipped = Vec::new();
        for tier in Tier::CASCADE {
            match self.try_tier(tier, user).await {
                Ok(route) => {
                    tracing::debug!(%tier, url = %route, "default division resolved");
                    return Resolution {
                        route,
                        tier,
                        skipped,
                    };
                }
                Err(e) => {
                    tracing::debug!(%tier, error = %e, "resolution tier skipped");
                    skipped.push((tier, e));
                }
            }
        }
        Resolution {
            route: self.fallback_route(),
            tier: Tier::Fallback,
            skipped,
        }
    }

    fn fallback_route(&self) -> DivisionRoute {
        DivisionRoute::new(self.fallback.url_path.clone(), self.fallback.slug.clone())
    }

    async fn try_tier(&self, tier: Tier, user: Option<&User>) -> Result<DivisionRoute, ResolutionError> {
        match tier {
            Tier::StoredDivision => self.from_stored_division().await,
            Tier::UserProfile => self.from_user_profile(user).await,
            Tier::AnonymousLocation => self.from_anonymous_location().await,
            Tier::Fallback => Ok(self.fallback_route()),
        }
    }

    async fn from_stored_division(&self) -> Result<DivisionRoute, ResolutionError> {
        let division = self
            .store
            .get_current()
            .await
            .ok_or(ResolutionError::NoStoredDivision)?;
        let country = division.country.as_deref().filter(|_| !division.slug.is_empty());
        let Some(country) = country else {
            return Err(ResolutionError::IncompleteStoredDivision { id: division.id });
        };
        let url_path = self.url_path_for(Some(country)).await;
        Ok(DivisionRoute::new(url_path, division.slug))
    }

    async fn from_user_profile(&self, user: Option<&User>) -> Result<DivisionRoute, ResolutionError> {
        let user = user.ok_or(ResolutionError::NoUser)?;
        let location = user.location.as_ref();
        let division_id = location
            .and_then(|l| l.division_id.as_deref())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ResolutionError::NoProfileDivision {
                user_id: user.id.clone(),
            })?;
        let city = location.and_then(|l| l.city.as_deref());
        let profile_country = location.and_then(|l| l.country.as_deref());
        self.route_for_division_id(division_id, city, profile_country)
            .await
    }

    async fn from_anonymous_location(&self) -> Result<DivisionRoute, ResolutionError> {
        let location = self
            .locations
            .get()
            .await
            .ok_or(ResolutionError::NoAnonymousLocation)?;
        let division_id = location
            .division_id()
            .ok_or(ResolutionError::NoLocationDivision)?;
        let city = location.location.as_ref().and_then(|l| l.city.as_deref());
        let country = location.country.as_ref().map(|c| c.iso3());
        self.route_for_division_id(division_id, city, country).await
    }

    async fn route_for_division_id(
        &self,
        id: &str,
        city: Option<&str>,
        country_hint: Option<&str>,
    ) -> Result<DivisionRoute, ResolutionError> {
        let input = self
            .api
            .division_by_id(id)
            .await
            .map_err(|source| ResolutionError::Fetch {
                id: id.to_string(),
                source,
            })?;
        let division = Division::from_input(input, 0);
        let slug = Some(division.slug.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| city.map(slugify).filter(|s| !s.is_empty()))
            .ok_or_else(|| ResolutionError::NoSlug { id: id.to_string() })?;
        let country = division.country.as_deref().or(country_hint);
        let url_path = self.url_path_for(country).await;
        Ok(DivisionRoute::new(url_path, slug))
    }

    /// Whether `segment` can open a division URL: a fixed-table path, the
    /// generic or fallback path, or an admin path the backend returned.
    pub async fn is_division_path(&self, segment: &str) -> bool {
        is_table_url_path(segment)
            || segment == GENERIC_URL_PATH
            || segment == self.fallback.url_path
            || self.learned_paths.read().await.contains(segment)
    }

    /// Fixed table first, then the backend's admin-path lookup.
    pub async fn url_path_for(&self, country: Option<&str>) -> String {
        let Some(country) = country else {
            return GENERIC_URL_PATH.to_string();
        };
        if let Some(path) = url_path_for_country(country) {
            return path.to_string();
        }
        match self.api.admin_path(country).await {
            Ok(path) if !path.trim_matches(|c: char| c == '/' || c.is_whitespace()).is_empty() => {
                let path = path.trim().trim_matches('/').to_string();
                self.learned_paths.write().await.insert(path.clone());
                path
            }
            Ok(_) => GENERIC_URL_PATH.to_string(),
            Err(e) => {
                tracing::debug!(country, error = %e, "admin path lookup failed");
                GENERIC_URL_PATH.to_string()
            }
        }
    }
}
