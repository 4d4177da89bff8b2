use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{AppError, AppResult};
use crate::models::{Event, Listing, Platform};
use crate::services::aggregate::{self, Gathered};
use crate::services::classify::{self, Phase};
use crate::services::{countdown, dates};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    let mut router = Router::new()
        .route("/contests", get(contests_feed))
        .route("/hackathons", get(hackathons_feed));

    for platform in Platform::ALL {
        router = router.route(
            &format!("/{}", platform),
            get(move |State(state): State<Arc<AppState>>| platform_feed(state, platform)),
        );
    }

    router
}

/// Failure body shared by every feed endpoint. Distinct from an empty feed,
/// which is a 200.
#[derive(Debug)]
pub struct FeedFailure(pub String);

impl IntoResponse for FeedFailure {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": true,
                "message": self.0
            })),
        )
            .into_response()
    }
}

/// Which partitions a classified feed returns. The other one is sent empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFilter {
    #[default]
    All,
    Ongoing,
    Upcoming,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub filter: FeedFilter,
}

/// One event as the feed lists it, with the countdown as of `generated_at`.
#[derive(Debug, Serialize)]
pub struct Card {
    #[serde(flatten)]
    pub event: Event,
    /// `<platform>-<externalId>-<phase>`, unique within a response.
    pub key: String,
    pub phase: Phase,
    pub countdown: String,
}

impl Card {
    fn new(event: Event, phase: Phase, listing: Listing, now: DateTime<Utc>) -> Self {
        let countdown = countdown::render(
            phase.countdown_target(&event),
            now,
            &countdown::terminal_label(listing, phase),
        );
        Self {
            key: format!("{}-{}", event.identity_key(), phase.as_str()),
            event,
            phase,
            countdown,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub success: bool,
    pub generated_at: String,
    pub ongoing: Vec<Card>,
    pub upcoming: Vec<Card>,
    /// Platforms whose fetch failed and contributed nothing.
    pub degraded: Vec<Platform>,
}

/// Classify the gathered events of one listing as of `now`.
pub fn build_feed(
    gathered: Gathered,
    listing: Listing,
    filter: FeedFilter,
    now: DateTime<Utc>,
) -> Result<FeedResponse, FeedFailure> {
    if gathered.all_failed() {
        let reasons: Vec<String> = gathered
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.platform.display_name(), f.message))
            .collect();
        return Err(FeedFailure(format!(
            "Failed to fetch {} ({})",
            listing.plural(),
            reasons.join("; ")
        )));
    }

    let classification = classify::classify(gathered.events, now);
    tracing::debug!(
        "{} feed: {} ongoing, {} upcoming, {} ended and hidden",
        listing.label(),
        classification.ongoing.len(),
        classification.upcoming.len(),
        classification.ended
    );

    let cards = |events: Vec<Event>, phase: Phase| -> Vec<Card> {
        events
            .into_iter()
            .map(|event| Card::new(event, phase, listing, now))
            .collect()
    };

    let ongoing = match filter {
        FeedFilter::All | FeedFilter::Ongoing => cards(classification.ongoing, Phase::Ongoing),
        FeedFilter::Upcoming => Vec::new(),
    };
    let upcoming = match filter {
        FeedFilter::All | FeedFilter::Upcoming => cards(classification.upcoming, Phase::Upcoming),
        FeedFilter::Ongoing => Vec::new(),
    };

    Ok(FeedResponse {
        success: true,
        generated_at: dates::canonical_iso(&now),
        ongoing,
        upcoming,
        degraded: gathered.failures.iter().map(|f| f.platform).collect(),
    })
}

async fn classified_feed(
    state: &AppState,
    listing: Listing,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let gathered = aggregate::gather(&state.sources.for_listing(listing)).await;
    // Classification uses the instant the fetch completed.
    let now = Utc::now();

    Ok(match build_feed(gathered, listing, query.filter, now) {
        Ok(feed) => Json(feed).into_response(),
        Err(failure) => failure.into_response(),
    })
}

async fn contests_feed(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> AppResult<Response> {
    classified_feed(&state, Listing::Contest, query).await
}

async fn hackathons_feed(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> AppResult<Response> {
    classified_feed(&state, Listing::Hackathon, query).await
}

/// Raw, unclassified listing of a single platform in upstream order.
async fn platform_feed(state: Arc<AppState>, platform: Platform) -> Response {
    let failure = || {
        FeedFailure(format!(
            "Failed to fetch {} {}",
            platform.display_name(),
            platform.listing().plural()
        ))
    };

    let events = match state.sources.get(platform).fetch_events().await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("{} endpoint failed: {}", platform, e);
            return failure().into_response();
        }
    };

    let events = match serde_json::to_value(events) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to serialize {} events: {}", platform, e);
            return failure().into_response();
        }
    };

    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(platform.collection_key(), events);

    Json(Value::Object(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{ExternalId, Location};
    use crate::services::aggregate::SourceFailure;
    use crate::services::upstream::fake::FakeUpstream;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, TimeZone};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(fake: FakeUpstream) -> Router {
        let state = Arc::new(AppState::new(Config::default(), Arc::new(fake)));
        router().with_state(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn codeforces_ok(ids: &[i64]) -> Value {
        let result: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "name": format!("Round {}", id),
                    "phase": "BEFORE",
                    // 2096-10-02, far enough to stay upcoming.
                    "startTimeSeconds": 4_000_000_000i64 + id
                })
            })
            .collect();
        json!({ "status": "OK", "result": result })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn event(id: i64, start_h: Option<i64>, end_h: Option<i64>) -> Event {
        Event {
            external_id: ExternalId::Number(id),
            title: format!("Hack {}", id),
            platform: Platform::Unstop,
            url: format!("https://unstop.com/{}", id),
            start_date: start_h.map(|h| now() + Duration::hours(h)),
            end_date: end_h.map(|h| now() + Duration::hours(h)),
            start_date_formatted: None,
            end_date_formatted: None,
            location: Location::Online,
            status: None,
            prizes: None,
            raw_json: Value::Null,
        }
    }

    #[tokio::test]
    async fn one_failing_platform_degrades_the_contest_feed() {
        let upstream = Config::default().upstream;
        let fake = FakeUpstream::new()
            .with_failure(&upstream.codechef_url, "network unreachable")
            .with_json(&upstream.codeforces_url, codeforces_ok(&[3, 1, 2]));

        let (status, body) = get_json(app(fake), "/contests").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["degraded"], json!(["codechef"]));
        assert_eq!(body["ongoing"], json!([]));

        let upcoming = body["upcoming"].as_array().unwrap();
        assert_eq!(upcoming.len(), 3);
        let keys: Vec<&str> = upcoming.iter().map(|c| c["key"].as_str().unwrap()).collect();
        assert_eq!(
            keys,
            vec![
                "codeforces-1-upcoming",
                "codeforces-2-upcoming",
                "codeforces-3-upcoming"
            ]
        );
        assert_eq!(upcoming[0]["phase"], json!("upcoming"));
        assert!(upcoming[0]["countdown"].as_str().unwrap().contains('d'));
        assert_eq!(upcoming[0]["url"], json!("https://codeforces.com/contest/1"));
    }

    #[tokio::test]
    async fn feed_fails_only_when_every_platform_failed() {
        let (status, body) = get_json(app(FakeUpstream::new()), "/hackathons").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!(true));
        assert!(body["message"].as_str().unwrap().starts_with("Failed to fetch hackathons"));
    }

    #[tokio::test]
    async fn empty_upstreams_are_not_a_failure() {
        let upstream = Config::default().upstream;
        let fake = FakeUpstream::new()
            .with_json(
                &upstream.codechef_url,
                json!({ "present_contests": [], "future_contests": [] }),
            )
            .with_json(&upstream.codeforces_url, codeforces_ok(&[]));

        let (status, body) = get_json(app(fake), "/contests").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ongoing"], json!([]));
        assert_eq!(body["upcoming"], json!([]));
        assert_eq!(body["degraded"], json!([]));
    }

    #[tokio::test]
    async fn unknown_filter_is_a_bad_request() {
        let (status, body) = get_json(app(FakeUpstream::new()), "/contests?filter=past").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
    }

    #[tokio::test]
    async fn platform_endpoint_lists_raw_events_under_its_key() {
        let upstream = Config::default().upstream;
        let fake = FakeUpstream::new().with_json(&upstream.codeforces_url, codeforces_ok(&[7, 8]));

        let (status, body) = get_json(app(fake), "/codeforces").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        let contests = body["codeforces_contests"].as_array().unwrap();
        assert_eq!(contests.len(), 2);
        assert_eq!(contests[0]["externalId"], json!(7));
        assert_eq!(contests[0]["platform"], json!("codeforces"));
    }

    #[tokio::test]
    async fn platform_endpoint_failure_uses_failure_body() {
        let (status, body) = get_json(app(FakeUpstream::new()), "/unstop").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Failed to fetch Unstop hackathons"));
    }

    #[test]
    fn build_feed_partitions_and_renders_countdowns() {
        let gathered = Gathered {
            events: vec![
                event(1, Some(-2), Some(25)),
                event(2, Some(1), None),
                event(3, Some(-5), Some(-1)),
            ],
            failures: Vec::new(),
            attempted: 1,
        };

        let feed = build_feed(gathered, Listing::Hackathon, FeedFilter::All, now()).unwrap();

        assert_eq!(feed.generated_at, "2024-06-01T12:00:00.000Z");
        assert_eq!(feed.ongoing.len(), 1);
        assert_eq!(feed.ongoing[0].key, "unstop-1-ongoing");
        assert_eq!(feed.ongoing[0].countdown, "1d 1h 0m 0s");
        assert_eq!(feed.upcoming.len(), 1);
        assert_eq!(feed.upcoming[0].countdown, "1h 0m 0s");
    }

    #[test]
    fn filter_blanks_the_other_partition() {
        let gathered = || Gathered {
            events: vec![event(1, Some(-2), None), event(2, Some(2), None)],
            failures: Vec::new(),
            attempted: 1,
        };

        let ongoing = build_feed(gathered(), Listing::Hackathon, FeedFilter::Ongoing, now()).unwrap();
        assert_eq!(ongoing.ongoing.len(), 1);
        assert!(ongoing.upcoming.is_empty());

        let upcoming = build_feed(gathered(), Listing::Hackathon, FeedFilter::Upcoming, now()).unwrap();
        assert!(upcoming.ongoing.is_empty());
        assert_eq!(upcoming.upcoming.len(), 1);
    }

    #[test]
    fn degraded_lists_failed_platforms() {
        let gathered = Gathered {
            events: vec![event(4, Some(3), None)],
            failures: vec![SourceFailure {
                platform: Platform::Devfolio,
                message: "timeout".to_string(),
            }],
            attempted: 2,
        };

        let feed = build_feed(gathered, Listing::Hackathon, FeedFilter::All, now()).unwrap();
        assert_eq!(feed.degraded, vec![Platform::Devfolio]);
        assert_eq!(feed.upcoming.len(), 1);
    }
}
