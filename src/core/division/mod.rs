//! Administrative divisions (municipality, commune, city) and the pure
//! helpers that turn them into URL segments.

mod store;

use serde::{Deserialize, Deserializer, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

pub use store::{CURRENT_DIVISION_KEY, DivisionStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
}

/// A division as persisted under `currentActiveDivision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    pub country: Option<String>,
    pub parent: Option<ParentRef>,
    pub admin_level: Option<i32>,
    pub boundary_type: Option<String>,
    #[serde(default, deserialize_with = "opaque_id_opt")]
    pub level_1_id: Option<String>,
    /// Unix milliseconds of the last write.
    pub timestamp: i64,
}

/// Country as sent by the backend: either a bare ISO3 code or a nested record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountryField {
    Code(String),
    Nested {
        #[serde(alias = "code", alias = "iso_code")]
        iso3: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl CountryField {
    pub fn iso3(&self) -> &str {
        match self {
            CountryField::Code(code) => code,
            CountryField::Nested { iso3, .. } => iso3,
        }
    }
}

/// Loosely shaped division data, as it arrives from the backend, a profile or
/// a picker. [`Division::from_input`] normalizes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionInput {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub country: Option<CountryField>,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default, deserialize_with = "opaque_id_opt")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default, alias = "adminLevel")]
    pub admin_level: Option<i32>,
    #[serde(default, alias = "boundaryType")]
    pub boundary_type: Option<String>,
    #[serde(default, deserialize_with = "opaque_id_opt")]
    pub level_1_id: Option<String>,
}

impl DivisionInput {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_country(mut self, iso3: impl Into<String>) -> Self {
        self.country = Some(CountryField::Code(iso3.into()));
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

impl Division {
    /// Normalize an input record, stamping it with `timestamp`.
    ///
    /// A nested parent wins over flat `parent_id`/`parent_name`; a flat parent
    /// is only kept when both halves are present. The slug falls back to the
    /// derivation of `name` when the input carries none.
    pub fn from_input(input: DivisionInput, timestamp: i64) -> Self {
        let slug = input
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| slugify(&input.name));
        let parent = input.parent.or_else(|| match (input.parent_id, input.parent_name) {
            (Some(id), Some(name)) => Some(ParentRef { id, name }),
            _ => None,
        });
        Self {
            id: input.id,
            name: input.name,
            slug,
            country: input
                .country
                .map(|c| c.iso3().trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty()),
            parent,
            admin_level: input.admin_level,
            boundary_type: input.boundary_type,
            level_1_id: input.level_1_id,
            timestamp,
        }
    }

    /// URL path segment for this division's country, if the country is in the
    /// fixed table.
    pub fn url_path(&self) -> Option<&'static str> {
        self.country.as_deref().and_then(url_path_for_country)
    }
}

/// Fixed ISO3 → URL path segment table.
pub fn url_path_for_country(iso3: &str) -> Option<&'static str> {
    match iso3.to_ascii_uppercase().as_str() {
        "CAN" => Some("municipality"),
        "BEN" => Some("commune"),
        "USA" => Some("city"),
        "FRA" => Some("commune"),
        _ => None,
    }
}

/// Whether `segment` is one of the fixed table's URL paths.
pub fn is_table_url_path(segment: &str) -> bool {
    matches!(segment, "municipality" | "commune" | "city")
}

/// Derive a URL-safe slug: lowercase, diacritics stripped, runs of anything
/// outside `[a-z0-9]` collapsed to one `-`, no leading or trailing `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Backend ids are opaque; accept both JSON strings and numbers.
pub(crate) fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

pub(crate) fn opaque_id_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}
