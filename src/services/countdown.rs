//! Live countdown strings for a single card.
//!
//! [`render`] is the pure formatting step. [`CountdownTicker`] re-runs it on a
//! fixed period in a background task owned by the ticker; dropping the ticker
//! stops the task.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::models::Listing;
use crate::services::classify::Phase;

const SECOND_MS: i64 = 1000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Label shown once the countdown target has passed, e.g. `Contest started`.
pub fn terminal_label(listing: Listing, phase: Phase) -> String {
    let verb = match phase {
        Phase::Upcoming => "started",
        Phase::Ongoing | Phase::Ended => "ended",
    };
    format!("{} {}", listing.label(), verb)
}

/// Time left until `target` as seen at `now`.
///
/// Empty without a target, `terminal` once the target is in the past, and
/// otherwise only the significant units: `1d 1h 1m 1s`, `3h 0m 5s`, `4m 2s`.
pub fn render(target: Option<DateTime<Utc>>, now: DateTime<Utc>, terminal: &str) -> String {
    let Some(target) = target else {
        return String::new();
    };

    let delta = (target - now).num_milliseconds();
    if delta < 0 {
        return terminal.to_string();
    }

    let days = delta / DAY_MS;
    let hours = (delta % DAY_MS) / HOUR_MS;
    let minutes = (delta % HOUR_MS) / MINUTE_MS;
    let seconds = (delta % MINUTE_MS) / SECOND_MS;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}

/// Recomputes one countdown every `period` and publishes it on a watch channel.
pub struct CountdownTicker {
    rx: watch::Receiver<String>,
    handle: JoinHandle<()>,
}

impl CountdownTicker {
    /// Must be called from within a tokio runtime. The first value is computed
    /// synchronously so [`CountdownTicker::current`] is never stale.
    pub fn spawn(target: Option<DateTime<Utc>>, terminal: String, period: Duration) -> Self {
        let (tx, rx) = watch::channel(render(target, Utc::now(), &terminal));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and was covered above.
            interval.tick().await;

            loop {
                interval.tick().await;
                if tx.send(render(target, Utc::now(), &terminal)).is_err() {
                    break;
                }
            }
        });

        Self { rx, handle }
    }

    pub fn current(&self) -> String {
        self.rx.borrow().clone()
    }

    /// Wait for the next tick. `None` once the task is gone.
    pub async fn changed(&mut self) -> Option<String> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
