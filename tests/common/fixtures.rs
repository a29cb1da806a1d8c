use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use municipal_portal::core::{
    api::{ApiError, Country, LoginResponse, PortalApi, User, UserLocation},
    division::{DivisionInput, slugify},
    location::{AnonymousLocation, IpLocation},
    resolver::FallbackDivision,
    storage::MemoryStorage,
};

/// In-memory stand-in for the portal backend. Every call is recorded.
#[derive(Debug, Default)]
pub struct FakeApi {
    divisions: Vec<DivisionInput>,
    failing_ids: Vec<String>,
    admin_paths: HashMap<String, String>,
    countries: Vec<Country>,
    location: Option<AnonymousLocation>,
    accounts: Vec<(String, String, User)>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_division(mut self, division: DivisionInput) -> Self {
        self.divisions.push(division);
        self
    }

    /// Lookups of this id fail with a 503.
    pub fn with_failing_id(mut self, id: &str) -> Self {
        self.failing_ids.push(id.to_string());
        self
    }

    pub fn with_admin_path(mut self, country: &str, path: &str) -> Self {
        self.admin_paths.insert(country.to_string(), path.to_string());
        self
    }

    pub fn with_countries(mut self, countries: Vec<Country>) -> Self {
        self.countries = countries;
        self
    }

    pub fn with_location(mut self, location: AnonymousLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// `login(username, password)` succeeds for this account.
    pub fn with_account(mut self, username: &str, password: &str, user: User) -> Self {
        self.accounts
            .push((username.to_string(), password.to_string(), user));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PortalApi for FakeApi {
    async fn division_by_slug(&self, slug: &str) -> Result<DivisionInput, ApiError> {
        self.record(format!("slug:{slug}"));
        self.divisions
            .iter()
            .find(|d| d.slug.clone().unwrap_or_else(|| slugify(&d.name)) == slug)
            .cloned()
            .ok_or(ApiError::NotFound {
                resource: format!("division with slug {slug:?}"),
            })
    }

    async fn division_by_id(&self, id: &str) -> Result<DivisionInput, ApiError> {
        self.record(format!("id:{id}"));
        if self.failing_ids.iter().any(|f| f == id) {
            return Err(ApiError::Status {
                url: format!("divisions/{id}"),
                status: 503,
            });
        }
        self.divisions
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(ApiError::NotFound {
                resource: format!("division {id}"),
            })
    }

    async fn division_neighbors(&self, id: &str) -> Result<Vec<DivisionInput>, ApiError> {
        self.record(format!("neighbors:{id}"));
        Ok(self.divisions.iter().filter(|d| d.id != id).cloned().collect())
    }

    async fn search_divisions(
        &self,
        query: &str,
        _country: Option<&str>,
    ) -> Result<Vec<DivisionInput>, ApiError> {
        self.record(format!("search:{query}"));
        let needle = query.to_lowercase();
        Ok(self
            .divisions
            .iter()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn admin_path(&self, country: &str) -> Result<String, ApiError> {
        self.record(format!("admin-path:{country}"));
        self.admin_paths
            .get(country)
            .cloned()
            .ok_or(ApiError::NotFound {
                resource: format!("admin path for {country}"),
            })
    }

    async fn countries(&self) -> Result<Vec<Country>, ApiError> {
        self.record("countries".to_string());
        Ok(self.countries.clone())
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.record("me".to_string());
        Err(ApiError::Unauthenticated)
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.record(format!("login:{username}"));
        self.accounts
            .iter()
            .find(|(u, p, _)| u == username && p == password)
            .map(|(u, _, user)| LoginResponse {
                token: format!("token-{u}"),
                user: user.clone(),
            })
            .ok_or(ApiError::Unauthenticated)
    }

    async fn geolocate_ip(&self) -> Result<AnonymousLocation, ApiError> {
        self.record("geolocate".to_string());
        self.location.clone().ok_or(ApiError::Status {
            url: "geolocation/ip".to_string(),
            status: 502,
        })
    }
}

pub fn storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

pub fn division(id: &str, name: &str, country: &str) -> DivisionInput {
    DivisionInput::new(id, name).with_country(country)
}

pub fn user_with_division(division_id: &str, city: &str, country: &str) -> User {
    User {
        id: "u1".to_string(),
        username: "citizen".to_string(),
        location: Some(UserLocation {
            division_id: Some(division_id.to_string()),
            city: Some(city.to_string()),
            country: Some(country.to_string()),
        }),
    }
}

pub fn anonymous_location_in(division_id: &str, city: &str) -> AnonymousLocation {
    AnonymousLocation {
        country: None,
        location: Some(IpLocation {
            administrative_division_id: Some(division_id.to_string()),
            city: Some(city.to_string()),
            region: None,
        }),
        closest_divisions: Vec::new(),
    }
}

pub fn fallback() -> FallbackDivision {
    FallbackDivision {
        url_path: "municipality".to_string(),
        slug: "montreal".to_string(),
    }
}
