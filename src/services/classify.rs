//! Ongoing/upcoming partition of a merged event set against a reference instant.
//!
//! Only `start_date` and `end_date` decide membership; the upstream `status`
//! label is ignored.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Started, and either open-ended or not yet over.
    Ongoing,
    /// Start unknown or still in the future.
    Upcoming,
    /// Started and already over. Listed in neither partition.
    Ended,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Ongoing => "ongoing",
            Phase::Upcoming => "upcoming",
            Phase::Ended => "ended",
        }
    }

    /// Instant a live countdown for this phase runs towards.
    pub fn countdown_target(self, event: &Event) -> Option<DateTime<Utc>> {
        match self {
            Phase::Upcoming => event.start_date,
            Phase::Ongoing | Phase::Ended => event.end_date,
        }
    }
}

pub fn phase_of(event: &Event, now: DateTime<Utc>) -> Phase {
    match event.start_date {
        None => Phase::Upcoming,
        Some(start) if start > now => Phase::Upcoming,
        Some(_) => match event.end_date {
            Some(end) if end < now => Phase::Ended,
            _ => Phase::Ongoing,
        },
    }
}

#[derive(Debug, Default)]
pub struct Classification {
    /// Soonest end first; open-ended events last.
    pub ongoing: Vec<Event>,
    /// Soonest start first; events without a start last.
    pub upcoming: Vec<Event>,
    /// Number of events left out because they are over.
    pub ended: usize,
}

/// Ascending with `None` treated as the far future.
fn none_last(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Partition `events` as of `now`. Both sorts are stable, so ties keep the
/// merge order of the input.
pub fn classify(events: Vec<Event>, now: DateTime<Utc>) -> Classification {
    let mut classification = Classification::default();

    for event in events {
        match phase_of(&event, now) {
            Phase::Ongoing => classification.ongoing.push(event),
            Phase::Upcoming => classification.upcoming.push(event),
            Phase::Ended => classification.ended += 1,
        }
    }

    classification
        .ongoing
        .sort_by(|a, b| none_last(a.end_date, b.end_date));
    classification
        .upcoming
        .sort_by(|a, b| none_last(a.start_date, b.start_date));

    classification
}
