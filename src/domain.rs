use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BiomodelsError;

pub const MODEL_ID_PREFIX: &str = "BIOMD";
pub const MODEL_ID_DIGITS: usize = 10;

/// Canonical BioModels identifier, e.g. `BIOMD0000000001`.
///
/// Numeric-only input is expanded to the canonical zero-padded form so the
/// cache never holds two entries differing only by padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(String);

impl ModelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModelId {
    type Err = BiomodelsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(BiomodelsError::InvalidModelId(value.to_string()));
        }
        if trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Ok(Self(format!(
                "{MODEL_ID_PREFIX}{trimmed:0>width$}",
                width = MODEL_ID_DIGITS
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// The cache's unified storage shape for a model's metadata.
///
/// Every field except the identifier is optional, and unknown upstream fields
/// are carried in `extra` so records survive export/import unchanged. Both
/// `id` and `model_id` hold the resolved identifier for backward-compatible
/// lookups by either name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalRecord {
    pub id: String,
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A record as returned by the upstream API, before normalization.
///
/// The canonical field names are typed so that normalizing an
/// already-canonical record is a no-op; everything else lands in `extra`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub id: Option<String>,
    pub model_id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub citation: Option<String>,
    pub journal: Option<String>,
    pub date: Option<String>,
    pub url: Option<String>,
    pub authors: Option<AuthorList>,
    pub publication: Option<Publication>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Nested publication sub-object some upstream shapes carry instead of
/// top-level bibliographic fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Publication {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<AuthorList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Upstream author lists come either as plain display names or as structured
/// objects. Resolved to names once, at the normalization boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorList {
    Names(Vec<String>),
    Structured(Vec<AuthorRef>),
}

impl AuthorList {
    /// Projects the list to an ordered sequence of display names. Order and
    /// duplicates are preserved; structured entries without a name are
    /// dropped.
    pub fn into_names(self) -> Vec<String> {
        match self {
            AuthorList::Names(names) => names,
            AuthorList::Structured(authors) => {
                authors.into_iter().filter_map(|author| author.name).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Structured search filters; each present filter is AND-ed with the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journals: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

/// Inclusive calendar-date range, both bounds `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}
