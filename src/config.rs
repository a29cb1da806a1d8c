//! Portal client configuration, stored as TOML in the platform config
//! directory (or an explicit path).

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::resolver::FallbackDivision;

const APP_NAME: &str = "municipal-portal";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),

    #[error("api base url must not be empty")]
    EmptyApiBaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    pub api_base_url: String,
    /// Durable client storage. Falls back to in-memory storage when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_file: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub url_path: String,
    pub slug: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        let fallback = FallbackDivision::default();
        Self {
            url_path: fallback.url_path,
            slug: fallback.slug,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            storage_file: None,
            request_timeout_secs: default_timeout_secs(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Load from `path`, or from the default location when `None`. A missing
    /// file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = match path {
            Some(path) => confy::load_path(path)?,
            None => confy::load(APP_NAME, None)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<(), ConfigError> {
        match path {
            Some(path) => confy::store_path(path, self),
            None => confy::store(APP_NAME, None, self),
        }
        .map_err(ConfigError::Save)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::EmptyApiBaseUrl);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fallback_division(&self) -> FallbackDivision {
        FallbackDivision {
            url_path: self.fallback.url_path.clone(),
            slug: self.fallback.slug.clone(),
        }
    }
}
