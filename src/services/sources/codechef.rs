use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{decode_record, records_at, SourceAdapter};
use crate::error::AppResult;
use crate::models::{Event, ExternalId, Location, Platform};
use crate::services::dates::{self, IST};
use crate::services::upstream::UpstreamClient;

const CONTEST_URL: &str = "https://www.codechef.com";

/// One entry of `present_contests` / `future_contests`.
#[derive(Debug, Deserialize)]
struct CodeChefContest {
    contest_code: String,
    contest_name: String,
    #[serde(default, rename = "startTimeSeconds")]
    start_time_seconds: Option<Value>,
    #[serde(default, rename = "endTimeSeconds")]
    end_time_seconds: Option<Value>,
    #[serde(default)]
    contest_start_date_iso: Option<String>,
    #[serde(default)]
    contest_end_date_iso: Option<String>,
    /// Wall-clock IST, e.g. "10 Jan 2024  20:00:00".
    #[serde(default)]
    contest_start_date: Option<String>,
    #[serde(default)]
    contest_end_date: Option<String>,
}

/// Resolve one CodeChef instant: epoch seconds first, then the ISO field that
/// carries its own offset, then the IST wall-clock text.
fn resolve_instant(
    epoch: Option<&Value>,
    iso: Option<&str>,
    text: Option<&str>,
) -> Option<DateTime<Utc>> {
    epoch
        .and_then(dates::epoch_from_value)
        .or_else(|| iso.and_then(dates::parse_offset_iso))
        .or_else(|| text.and_then(|t| dates::parse_zoned_text(t, IST)))
}

pub struct CodeChefSource {
    client: Arc<dyn UpstreamClient>,
    url: String,
}

impl CodeChefSource {
    pub fn new(client: Arc<dyn UpstreamClient>, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    fn map_contest(raw: &Value, status: &str) -> Option<Event> {
        let contest: CodeChefContest = decode_record(Platform::CodeChef, raw)?;

        let start = resolve_instant(
            contest.start_time_seconds.as_ref(),
            contest.contest_start_date_iso.as_deref(),
            contest.contest_start_date.as_deref(),
        );
        let end = resolve_instant(
            contest.end_time_seconds.as_ref(),
            contest.contest_end_date_iso.as_deref(),
            contest.contest_end_date.as_deref(),
        );

        Some(Event {
            url: format!("{}/{}", CONTEST_URL, contest.contest_code),
            external_id: ExternalId::Text(contest.contest_code),
            title: contest.contest_name,
            platform: Platform::CodeChef,
            start_date: start,
            end_date: end,
            start_date_formatted: start.map(|dt| dates::format_in_zone(&dt, IST)),
            end_date_formatted: end.map(|dt| dates::format_in_zone(&dt, IST)),
            location: Location::Online,
            status: Some(status.to_string()),
            prizes: None,
            raw_json: raw.clone(),
        })
    }

    pub(crate) fn map_payload(payload: &Value) -> Vec<Event> {
        let present = records_at(payload, "/present_contests");
        let future = records_at(payload, "/future_contests");

        present
            .iter()
            .filter_map(|raw| Self::map_contest(raw, "ONGOING"))
            .chain(
                future
                    .iter()
                    .filter_map(|raw| Self::map_contest(raw, "UPCOMING")),
            )
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for CodeChefSource {
    fn platform(&self) -> Platform {
        Platform::CodeChef
    }

    async fn fetch_events(&self) -> AppResult<Vec<Event>> {
        let payload = self.client.get_json(&self.url).await?;
        let events = Self::map_payload(&payload);
        tracing::info!("Fetched {} CodeChef contests", events.len());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::upstream::fake::FakeUpstream;
    use serde_json::json;

    const URL: &str = "https://codechef.test/contests";

    #[test]
    fn epoch_seconds_win_over_ist_text() {
        let payload = json!({
            "present_contests": [],
            "future_contests": [{
                "contest_code": "START117",
                "contest_name": "Starters 117",
                "startTimeSeconds": 1_700_000_000,
                "contest_start_date": "01 Jan 2030  09:00:00",
                "contest_end_date": "14 Nov 2023  22:13:20"
            }]
        });

        let events = CodeChefSource::map_payload(&payload);
        assert_eq!(events.len(), 1);

        let event = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(event["startDate"], json!("2023-11-14T22:13:20.000Z"));
        // No epoch for the end: IST text is used.
        assert_eq!(event["endDate"], json!("2023-11-14T16:43:20.000Z"));
        assert_eq!(event["startDateFormatted"], json!("15 Nov 2023, 03:43 AM"));
        assert_eq!(event["url"], json!("https://www.codechef.com/START117"));
        assert_eq!(event["externalId"], json!("START117"));
        assert_eq!(event["location"], json!("Online"));
        assert_eq!(event["status"], json!("UPCOMING"));
    }

    #[test]
    fn iso_offset_field_is_used_before_text() {
        let payload = json!({
            "future_contests": [{
                "contest_code": "START118",
                "contest_name": "Starters 118",
                "contest_start_date_iso": "2024-01-10T20:00:00+05:30",
                "contest_start_date": "garbage"
            }]
        });

        let events = CodeChefSource::map_payload(&payload);
        assert_eq!(
            events[0].start_date.map(|dt| dates::canonical_iso(&dt)),
            Some("2024-01-10T14:30:00.000Z".to_string())
        );
        assert_eq!(events[0].end_date, None);
        assert_eq!(events[0].end_date_formatted, None);
    }

    #[test]
    fn epoch_seconds_win_over_disagreeing_iso_field() {
        let payload = json!({
            "future_contests": [{
                "contest_code": "START119",
                "contest_name": "Starters 119",
                "startTimeSeconds": 1_700_000_000,
                "contest_start_date_iso": "2024-01-10T20:00:00+05:30",
                "endTimeSeconds": "1700007200",
                "contest_end_date_iso": "2024-01-10T22:00:00+05:30"
            }]
        });

        let events = CodeChefSource::map_payload(&payload);
        assert_eq!(
            events[0].start_date.map(|dt| dates::canonical_iso(&dt)),
            Some("2023-11-14T22:13:20.000Z".to_string())
        );
        assert_eq!(
            events[0].end_date.map(|dt| dates::canonical_iso(&dt)),
            Some("2023-11-15T00:13:20.000Z".to_string())
        );
    }

    #[test]
    fn unparseable_dates_become_null_without_dropping_the_event() {
        let payload = json!({
            "present_contests": [{
                "contest_code": "LTIME",
                "contest_name": "Lunchtime",
                "contest_start_date": "sometime soon"
            }]
        });

        let events = CodeChefSource::map_payload(&payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_date, None);
        assert_eq!(events[0].status.as_deref(), Some("ONGOING"));
    }

    #[test]
    fn present_bucket_precedes_future_and_bad_records_are_skipped() {
        let payload = json!({
            "present_contests": [{ "contest_code": "A", "contest_name": "Present" }],
            "future_contests": [
                { "contest_name": "no code" },
                { "contest_code": "B", "contest_name": "Future" }
            ]
        });

        let ids: Vec<String> = CodeChefSource::map_payload(&payload)
            .iter()
            .map(|e| e.external_id.to_string())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn non_array_buckets_are_empty() {
        let payload = json!({ "present_contests": null, "future_contests": "n/a" });
        assert!(CodeChefSource::map_payload(&payload).is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error() {
        let client = Arc::new(FakeUpstream::new().with_failure(URL, "503 Service Unavailable"));
        let source = CodeChefSource::new(client, URL);
        assert!(source.fetch_events().await.is_err());
    }
}
