use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};

use super::{ApiError, Country, LoginResponse, PortalApi, User};
use crate::core::division::DivisionInput;
use crate::core::location::AnonymousLocation;

const USER_AGENT: &str = concat!("municipal-portal/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpPortalApi {
    base_url: Url,
    client: reqwest::Client,
    token: Option<String>,
}

#[derive(Deserialize)]
struct AdminPathResponse {
    url_path: String,
}

impl HttpPortalApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        // Url::join drops the last segment unless the base ends with '/'.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url,
            client,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        resource: impl FnOnce() -> String,
    ) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        let mut request = self.client.get(url.clone()).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        tracing::debug!(%url, "GET");
        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound {
                resource: resource(),
            }),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthenticated),
            status if !status.is_success() => Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            _ => Ok(response.json().await?),
        }
    }
}

impl PortalApi for HttpPortalApi {
    async fn division_by_slug(&self, slug: &str) -> Result<DivisionInput, ApiError> {
        self.get_json(&format!("divisions/slug/{slug}"), &[], || {
            format!("division with slug {slug:?}")
        })
        .await
    }

    async fn division_by_id(&self, id: &str) -> Result<DivisionInput, ApiError> {
        self.get_json(&format!("divisions/{id}"), &[], || format!("division {id}"))
            .await
    }

    async fn division_neighbors(&self, id: &str) -> Result<Vec<DivisionInput>, ApiError> {
        self.get_json(&format!("divisions/{id}/neighbors"), &[], || {
            format!("neighbors of division {id}")
        })
        .await
    }

    async fn search_divisions(
        &self,
        query: &str,
        country: Option<&str>,
    ) -> Result<Vec<DivisionInput>, ApiError> {
        let mut params = vec![("q", query)];
        if let Some(country) = country {
            params.push(("country", country));
        }
        self.get_json("divisions/search", &params, || "division search".to_string())
            .await
    }

    async fn admin_path(&self, country: &str) -> Result<String, ApiError> {
        let response: AdminPathResponse = self
            .get_json("divisions/admin-path", &[("country", country)], || {
                format!("admin path for {country}")
            })
            .await?;
        Ok(response.url_path)
    }

    async fn countries(&self) -> Result<Vec<Country>, ApiError> {
        self.get_json("countries", &[], || "country list".to_string())
            .await
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        if self.token.is_none() {
            return Err(ApiError::Unauthenticated);
        }
        self.get_json("auth/me", &[], || "current user".to_string())
            .await
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.base_url.join("auth/login")?;
        let response = self
            .client
            .post(url.clone())
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthenticated),
            status if !status.is_success() => Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            _ => Ok(response.json().await?),
        }
    }

    async fn geolocate_ip(&self) -> Result<AnonymousLocation, ApiError> {
        self.get_json("geolocation/ip", &[], || "ip geolocation".to_string())
            .await
    }
}
