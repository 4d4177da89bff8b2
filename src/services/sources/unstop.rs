use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{decode_record, records_at, value_label, SourceAdapter};
use crate::error::{AppError, AppResult};
use crate::models::{Event, ExternalId, Location, Platform};
use crate::services::dates::{self, IST};
use crate::services::upstream::UpstreamClient;

const SITE_URL: &str = "https://unstop.com";

#[derive(Debug, Deserialize)]
struct UnstopHackathon {
    id: ExternalId,
    title: String,
    public_url: String,
    #[serde(default, rename = "regnRequirements")]
    regn_requirements: Option<RegnRequirements>,
    #[serde(default)]
    end_date: Option<Value>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    prizes: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RegnRequirements {
    #[serde(default)]
    start_regn_dt: Option<Value>,
}

pub struct UnstopSource {
    client: Arc<dyn UpstreamClient>,
    base_url: String,
    max_pages: u32,
}

impl UnstopSource {
    pub fn new(client: Arc<dyn UpstreamClient>, base_url: &str, max_pages: u32) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            max_pages: max_pages.max(1),
        }
    }

    fn page_url(&self, page: u32) -> AppResult<String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Invalid Unstop URL {}: {}",
                self.base_url,
                e
            ))
        })?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url.into())
    }

    fn map_hackathon(raw: &Value) -> Option<Event> {
        let hackathon: UnstopHackathon = decode_record(Platform::Unstop, raw)?;

        let start_date = hackathon
            .regn_requirements
            .as_ref()
            .and_then(|r| r.start_regn_dt.as_ref())
            .and_then(|v| dates::normalize_value(v, IST));
        let end_date = hackathon
            .end_date
            .as_ref()
            .and_then(|v| dates::normalize_value(v, IST));

        Some(Event {
            url: format!(
                "{}/{}",
                SITE_URL,
                hackathon.public_url.trim_start_matches('/')
            ),
            external_id: hackathon.id,
            title: hackathon.title,
            platform: Platform::Unstop,
            start_date,
            end_date,
            start_date_formatted: None,
            end_date_formatted: None,
            location: Location::from_region(hackathon.region.as_deref()),
            status: hackathon.status.as_ref().and_then(value_label),
            prizes: hackathon.prizes.filter(|p| !p.is_null()),
            raw_json: raw.clone(),
        })
    }
}

/// `last_page` as a positive count; absent, zero or garbage means one page.
fn page_count(data: &Value) -> u32 {
    let count = match data.get("last_page") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match count {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 1,
    }
}

#[async_trait]
impl SourceAdapter for UnstopSource {
    fn platform(&self) -> Platform {
        Platform::Unstop
    }

    /// Walks pages 1..=last_page and returns all items in page order. Any
    /// failed page fails the whole fetch.
    async fn fetch_events(&self) -> AppResult<Vec<Event>> {
        let mut events = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.page_url(page)?;
            let payload = self.client.get_json(&url).await?;

            let Some(data) = payload.get("data").filter(|d| d.is_object()) else {
                tracing::warn!("Unstop page {} carried no data; stopping pagination", page);
                break;
            };

            events.extend(records_at(data, "/data").iter().filter_map(Self::map_hackathon));

            let mut last_page = page_count(data);
            if last_page > self.max_pages {
                tracing::warn!(
                    "Unstop reports {} pages; reading only the first {}",
                    last_page,
                    self.max_pages
                );
                last_page = self.max_pages;
            }

            if page >= last_page {
                break;
            }
            page += 1;
        }

        tracing::info!(
            "Fetched {} Unstop hackathons across {} page(s)",
            events.len(),
            page
        );
        Ok(events)
    }
}
