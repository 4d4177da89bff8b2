use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{decode_record, records_at, SourceAdapter};
use crate::error::{AppError, AppResult};
use crate::models::{Event, ExternalId, Location, Platform};
use crate::services::dates;
use crate::services::upstream::UpstreamClient;

const CONTEST_URL: &str = "https://codeforces.com/contest";

/// Contest phase meaning "not started yet".
const PHASE_BEFORE: &str = "BEFORE";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeforcesContest {
    id: i64,
    name: String,
    phase: String,
    #[serde(default)]
    start_time_seconds: Option<Value>,
}

pub struct CodeforcesSource {
    client: Arc<dyn UpstreamClient>,
    url: String,
}

impl CodeforcesSource {
    pub fn new(client: Arc<dyn UpstreamClient>, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    fn map_contest(raw: &Value) -> Option<Event> {
        let contest: CodeforcesContest = decode_record(Platform::Codeforces, raw)?;
        if contest.phase != PHASE_BEFORE {
            return None;
        }

        Some(Event {
            external_id: ExternalId::Number(contest.id),
            title: contest.name,
            platform: Platform::Codeforces,
            url: format!("{}/{}", CONTEST_URL, contest.id),
            start_date: contest
                .start_time_seconds
                .as_ref()
                .and_then(dates::epoch_from_value),
            // contest.list carries no end instant; the listing is open-ended.
            end_date: None,
            start_date_formatted: None,
            end_date_formatted: None,
            location: Location::Online,
            status: Some("UPCOMING".to_string()),
            prizes: None,
            raw_json: raw.clone(),
        })
    }

    pub(crate) fn map_payload(payload: &Value) -> AppResult<Vec<Event>> {
        if payload.get("status").and_then(Value::as_str) == Some("FAILED") {
            let comment = payload
                .get("comment")
                .and_then(Value::as_str)
                .unwrap_or("no comment");
            return Err(AppError::Upstream(format!(
                "Codeforces reported failure: {}",
                comment
            )));
        }

        Ok(records_at(payload, "/result")
            .iter()
            .filter_map(Self::map_contest)
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for CodeforcesSource {
    fn platform(&self) -> Platform {
        Platform::Codeforces
    }

    async fn fetch_events(&self) -> AppResult<Vec<Event>> {
        let payload = self.client.get_json(&self.url).await?;
        let events = Self::map_payload(&payload)?;
        tracing::info!("Fetched {} upcoming Codeforces contests", events.len());
        Ok(events)
    }
}
