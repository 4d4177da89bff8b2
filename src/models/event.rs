use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Location, Platform};
use crate::services::dates;

// ============================================================================
// Canonical Event
// ============================================================================

/// Identifier of an event on its own platform. Codeforces and Unstop use
/// numbers, CodeChef and Devfolio use strings. Only unique together with
/// the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Number(n) => write!(f, "{}", n),
            ExternalId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ExternalId {
    fn from(value: i64) -> Self {
        ExternalId::Number(value)
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        ExternalId::Text(value)
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        ExternalId::Text(value.to_string())
    }
}

/// A contest or hackathon listing normalized from one upstream record.
///
/// `start_date` and `end_date` are canonical UTC instants and serialize as
/// `YYYY-MM-DDTHH:MM:SS.mmmZ`. `status` is whatever label the upstream (or the
/// adapter's bucket) reported and is never used for classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub external_id: ExternalId,
    pub title: String,
    pub platform: Platform,
    pub url: String,
    #[serde(with = "dates::canonical_instant", default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(with = "dates::canonical_instant", default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_formatted: Option<String>,
    pub location: Location,
    pub status: Option<String>,
    pub prizes: Option<serde_json::Value>,
    /// Upstream record as received. Kept for audit, never read back.
    pub raw_json: serde_json::Value,
}

impl Event {
    /// `(platform, externalId)` composite, the only identity that is unique
    /// across the merged feed.
    pub fn identity_key(&self) -> String {
        format!("{}-{}", self.platform, self.external_id)
    }
}
