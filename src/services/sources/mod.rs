//! Source adapters: one per upstream platform, each turning that platform's
//! payload into canonical [`Event`]s.
//!
//! Adapters return `Err` for transport, status and body failures and leave the
//! degrade-to-empty policy to [`crate::services::aggregate`]. A payload whose
//! shape does not match (missing arrays, wrong types) is not a failure: the
//! affected bucket is simply empty. Individual records that do not decode are
//! skipped with a warning.

pub mod codechef;
pub mod codeforces;
pub mod devfolio;
pub mod unstop;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::AppResult;
use crate::models::{Event, Listing, Platform};
use crate::services::upstream::UpstreamClient;

pub use self::codechef::CodeChefSource;
pub use self::codeforces::CodeforcesSource;
pub use self::devfolio::DevfolioSource;
pub use self::unstop::UnstopSource;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetch and map the platform's current listings, in upstream order.
    async fn fetch_events(&self) -> AppResult<Vec<Event>>;
}

/// The four adapters wired to one upstream client.
#[derive(Clone)]
pub struct Sources {
    codechef: Arc<dyn SourceAdapter>,
    codeforces: Arc<dyn SourceAdapter>,
    devfolio: Arc<dyn SourceAdapter>,
    unstop: Arc<dyn SourceAdapter>,
}

impl Sources {
    pub fn new(config: &UpstreamConfig, client: Arc<dyn UpstreamClient>) -> Self {
        Self {
            codechef: Arc::new(CodeChefSource::new(client.clone(), &config.codechef_url)),
            codeforces: Arc::new(CodeforcesSource::new(client.clone(), &config.codeforces_url)),
            devfolio: Arc::new(DevfolioSource::new(client.clone(), &config.devfolio_url)),
            unstop: Arc::new(UnstopSource::new(
                client,
                &config.unstop_url,
                config.unstop_max_pages,
            )),
        }
    }

    pub fn get(&self, platform: Platform) -> Arc<dyn SourceAdapter> {
        match platform {
            Platform::CodeChef => self.codechef.clone(),
            Platform::Codeforces => self.codeforces.clone(),
            Platform::Devfolio => self.devfolio.clone(),
            Platform::Unstop => self.unstop.clone(),
        }
    }

    /// Adapters feeding one listing kind, in merge order.
    pub fn for_listing(&self, listing: Listing) -> Vec<Arc<dyn SourceAdapter>> {
        Platform::ALL
            .into_iter()
            .filter(|p| p.listing() == listing)
            .map(|p| self.get(p))
            .collect()
    }
}

/// Array found at a JSON pointer, or an empty slice for anything else.
pub(crate) fn records_at<'a>(payload: &'a Value, pointer: &str) -> &'a [Value] {
    match payload.pointer(pointer) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(other) => {
            tracing::warn!(
                "Expected an array at {} but found {}; treating as empty",
                pointer,
                json_kind(other)
            );
            &[]
        }
        None => &[],
    }
}

/// Decode one upstream record into its typed shape; malformed records are
/// logged and dropped.
pub(crate) fn decode_record<T: DeserializeOwned>(platform: Platform, raw: &Value) -> Option<T> {
    match T::deserialize(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("Skipping malformed {} record: {}", platform, e);
            None
        }
    }
}

/// Informational label from a loosely typed upstream field.
pub(crate) fn value_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
