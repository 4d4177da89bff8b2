use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::{future, stream, Stream, StreamExt};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::Listing;
use crate::services::classify::Phase;
use crate::services::countdown::{terminal_label, CountdownTicker};
use crate::services::dates;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/countdown", get(countdown_stream))
}

fn default_phase() -> Phase {
    Phase::Upcoming
}

fn default_listing() -> Listing {
    Listing::Contest
}

#[derive(Debug, Deserialize)]
pub struct CountdownQuery {
    /// Canonical instant the countdown runs towards. Absent means no countdown.
    pub target: Option<String>,
    #[serde(default = "default_phase")]
    pub phase: Phase,
    #[serde(default = "default_listing")]
    pub listing: Listing,
}

/// Live countdown for one card as Server-Sent Events.
///
/// Sends the current value right away and then one `countdown` event per
/// tick. The ticker lives inside the stream, so a disconnecting client stops
/// the recomputation.
async fn countdown_stream(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CountdownQuery>, QueryRejection>,
) -> AppResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let target = match query.target.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        None => None,
        Some(text) => Some(dates::parse_offset_iso(text).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid countdown target: {}", text))
        })?),
    };

    let ticker = CountdownTicker::spawn(
        target,
        terminal_label(query.listing, query.phase),
        Duration::from_millis(state.config.countdown.tick_millis),
    );
    tracing::debug!("Countdown stream opened for target {:?}", target);

    let first = ticker.current();
    let ticks = stream::unfold(ticker, |mut ticker| async move {
        let text = ticker.changed().await?;
        Some((text, ticker))
    });

    let events = stream::once(future::ready(first))
        .chain(ticks)
        .map(|text| Ok(SseEvent::default().event("countdown").data(text)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
