//! `/{url_path}/{division_slug}/{section}` URLs.

use std::fmt;

use thiserror::Error;

pub const DEFAULT_SECTION: &str = "accueil";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("{0:?} is not a division url")]
    NotADivisionUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionRoute {
    pub url_path: String,
    pub slug: String,
    pub section: String,
}

impl DivisionRoute {
    pub fn new(url_path: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            url_path: url_path.into(),
            slug: slug.into(),
            section: DEFAULT_SECTION.to_string(),
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Parse a path (query string and fragment ignored). Anything after the
    /// slug is kept as the section, so `/commune/cotonou/posts/12` has section
    /// `posts/12`.
    pub fn parse(url: &str) -> Result<Self, RouteError> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let (Some(url_path), Some(slug)) = (segments.next(), segments.next()) else {
            return Err(RouteError::NotADivisionUrl(url.to_string()));
        };
        let section = segments.collect::<Vec<_>>().join("/");
        Ok(Self {
            url_path: url_path.to_string(),
            slug: slug.to_string(),
            section: if section.is_empty() {
                DEFAULT_SECTION.to_string()
            } else {
                section
            },
        })
    }

    pub fn to_url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DivisionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}/{}", self.url_path, self.slug, self.section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_route() {
        let route = DivisionRoute::parse("/municipality/sherbrooke/sondages?page=2").unwrap();
        assert_eq!(route.url_path, "municipality");
        assert_eq!(route.slug, "sherbrooke");
        assert_eq!(route.section, "sondages");
    }

    #[test]
    fn test_missing_section_defaults_to_home() {
        let route = DivisionRoute::parse("/commune/cotonou").unwrap();
        assert_eq!(route.to_url(), "/commune/cotonou/accueil");
    }

    #[test]
    fn test_nested_section_is_kept() {
        let route = DivisionRoute::parse("/city/boston/posts/12#top").unwrap();
        assert_eq!(route.section, "posts/12");
    }

    #[test]
    fn test_rejects_short_paths() {
        assert!(DivisionRoute::parse("/dashboard").is_err());
        assert!(DivisionRoute::parse("").is_err());
    }
}
