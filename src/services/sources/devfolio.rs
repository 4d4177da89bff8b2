use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{decode_record, records_at, SourceAdapter};
use crate::error::AppResult;
use crate::models::{Event, ExternalId, Location, Platform};
use crate::services::dates;
use crate::services::upstream::UpstreamClient;

/// Where the hackathon buckets live inside the Next.js page data.
const BUCKETS_POINTER: &str = "/pageProps/dehydratedState/queries/0/state/data";

#[derive(Debug, Deserialize)]
struct DevfolioHackathon {
    uuid: String,
    name: String,
    slug: String,
    #[serde(default)]
    starts_at: Option<Value>,
    #[serde(default)]
    ends_at: Option<Value>,
    #[serde(default)]
    is_online: Option<bool>,
}

pub struct DevfolioSource {
    client: Arc<dyn UpstreamClient>,
    url: String,
}

impl DevfolioSource {
    pub fn new(client: Arc<dyn UpstreamClient>, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    /// `bucket` is the upstream's own open/upcoming split. It is recorded as
    /// the informational status only.
    fn map_hackathon(raw: &Value, bucket: &str) -> Option<Event> {
        let hackathon: DevfolioHackathon = decode_record(Platform::Devfolio, raw)?;

        // Devfolio timestamps are UTC; offset-less ones are read as such.
        let zone = chrono_tz::UTC;

        Some(Event {
            url: format!("https://{}.devfolio.co/", hackathon.slug),
            external_id: ExternalId::Text(hackathon.uuid),
            title: hackathon.name,
            platform: Platform::Devfolio,
            start_date: hackathon
                .starts_at
                .as_ref()
                .and_then(|v| dates::normalize_value(v, zone)),
            end_date: hackathon
                .ends_at
                .as_ref()
                .and_then(|v| dates::normalize_value(v, zone)),
            start_date_formatted: None,
            end_date_formatted: None,
            location: Location::from_online_flag(hackathon.is_online.unwrap_or(false)),
            status: Some(bucket.to_string()),
            prizes: None,
            raw_json: raw.clone(),
        })
    }

    pub(crate) fn map_payload(payload: &Value) -> Vec<Event> {
        let Some(buckets) = payload.pointer(BUCKETS_POINTER) else {
            tracing::warn!("Devfolio payload has no hackathon data; treating as empty");
            return Vec::new();
        };

        let open = records_at(buckets, "/open_hackathons");
        let upcoming = records_at(buckets, "/upcoming_hackathons");

        open.iter()
            .filter_map(|raw| Self::map_hackathon(raw, "open"))
            .chain(
                upcoming
                    .iter()
                    .filter_map(|raw| Self::map_hackathon(raw, "upcoming")),
            )
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for DevfolioSource {
    fn platform(&self) -> Platform {
        Platform::Devfolio
    }

    async fn fetch_events(&self) -> AppResult<Vec<Event>> {
        let payload = self.client.get_json(&self.url).await?;
        let events = Self::map_payload(&payload);
        tracing::info!("Fetched {} Devfolio hackathons", events.len());
        Ok(events)
    }
}
