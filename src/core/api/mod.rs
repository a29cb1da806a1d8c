//! Typed view of the portal's REST backend.
//!
//! The backend itself is a collaborator; this module only describes the calls
//! the division logic makes and ships a `reqwest` implementation.

mod http;

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::division::{DivisionInput, opaque_id, opaque_id_opt};
use crate::core::location::AnonymousLocation;

pub use http::HttpPortalApi;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("not authenticated")]
    Unauthenticated,

    #[error("transport error")]
    Transport(#[from] reqwest::Error),

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLocation {
    #[serde(default, deserialize_with = "opaque_id_opt")]
    pub division_id: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub location: Option<UserLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub iso3: String,
    pub name: String,
    #[serde(default)]
    pub division_count: Option<u64>,
}

pub trait PortalApi {
    fn division_by_slug(&self, slug: &str) -> impl Future<Output = Result<DivisionInput, ApiError>>;
    fn division_by_id(&self, id: &str) -> impl Future<Output = Result<DivisionInput, ApiError>>;
    fn division_neighbors(&self, id: &str) -> impl Future<Output = Result<Vec<DivisionInput>, ApiError>>;
    fn search_divisions(
        &self,
        query: &str,
        country: Option<&str>,
    ) -> impl Future<Output = Result<Vec<DivisionInput>, ApiError>>;
    /// URL path segment the backend uses for divisions of `country`.
    fn admin_path(&self, country: &str) -> impl Future<Output = Result<String, ApiError>>;
    fn countries(&self) -> impl Future<Output = Result<Vec<Country>, ApiError>>;
    fn current_user(&self) -> impl Future<Output = Result<User, ApiError>>;
    fn login(&self, username: &str, password: &str) -> impl Future<Output = Result<LoginResponse, ApiError>>;
    fn geolocate_ip(&self) -> impl Future<Output = Result<AnonymousLocation, ApiError>>;
}
