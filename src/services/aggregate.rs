use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::models::{Event, Platform};
use crate::services::sources::SourceAdapter;

/// An adapter whose fetch failed and contributed nothing.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub platform: Platform,
    pub message: String,
}

/// Merged output of a set of adapters for one request.
#[derive(Debug, Default)]
pub struct Gathered {
    /// Events of every successful adapter, in adapter order then upstream order.
    pub events: Vec<Event>,
    pub failures: Vec<SourceFailure>,
    /// Number of adapters that were run.
    pub attempted: usize,
}

impl Gathered {
    /// True when at least one adapter ran and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failures.len() == self.attempted
    }
}

/// Run every adapter concurrently and merge what succeeded.
///
/// A failing adapter is logged and degrades to an empty contribution; it
/// never aborts the others. Merge order follows `adapters`, not completion order.
pub async fn gather(adapters: &[Arc<dyn SourceAdapter>]) -> Gathered {
    let results = join_all(adapters.iter().map(|adapter| async move {
        (adapter.platform(), adapter.fetch_events().await)
    }))
    .await;

    let mut gathered = Gathered {
        attempted: adapters.len(),
        ..Gathered::default()
    };

    for (platform, result) in results {
        match result {
            Ok(mut events) => gathered.events.append(&mut events),
            Err(e) => {
                tracing::warn!("{} fetch failed, contributing no events: {}", platform, e);
                gathered.failures.push(SourceFailure {
                    platform,
                    message: e.to_string(),
                });
            }
        }
    }

    gathered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::models::{ExternalId, Location};
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubSource {
        platform: Platform,
        ids: Vec<i64>,
        delay_ms: u64,
        fail: bool,
    }

    #[async_trait]
    impl SourceAdapter for StubSource {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch_events(&self) -> AppResult<Vec<Event>> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            if self.fail {
                return Err(AppError::Upstream("network unreachable".to_string()));
            }
            Ok(self
                .ids
                .iter()
                .map(|id| Event {
                    external_id: ExternalId::Number(*id),
                    title: format!("#{}", id),
                    platform: self.platform,
                    url: String::new(),
                    start_date: None,
                    end_date: None,
                    start_date_formatted: None,
                    end_date_formatted: None,
                    location: Location::Online,
                    status: None,
                    prizes: None,
                    raw_json: serde_json::Value::Null,
                })
                .collect())
        }
    }

    fn stub(platform: Platform, ids: &[i64], delay_ms: u64, fail: bool) -> Arc<dyn SourceAdapter> {
        Arc::new(StubSource {
            platform,
            ids: ids.to_vec(),
            delay_ms,
            fail,
        })
    }

    #[tokio::test]
    async fn merges_in_adapter_order_regardless_of_completion_order() {
        let gathered = gather(&[
            stub(Platform::CodeChef, &[1, 2], 30, false),
            stub(Platform::Codeforces, &[3], 0, false),
        ])
        .await;

        let ids: Vec<String> = gathered
            .events
            .iter()
            .map(|e| e.identity_key())
            .collect();
        assert_eq!(ids, vec!["codechef-1", "codechef-2", "codeforces-3"]);
        assert!(gathered.failures.is_empty());
        assert!(!gathered.all_failed());
    }

    #[tokio::test]
    async fn one_failure_does_not_contaminate_the_others() {
        let gathered = gather(&[
            stub(Platform::CodeChef, &[], 0, true),
            stub(Platform::Codeforces, &[10, 11, 12], 0, false),
        ])
        .await;

        assert_eq!(gathered.events.len(), 3);
        assert!(gathered
            .events
            .iter()
            .all(|e| e.platform == Platform::Codeforces));
        assert_eq!(gathered.failures.len(), 1);
        assert_eq!(gathered.failures[0].platform, Platform::CodeChef);
        assert!(gathered.failures[0].message.contains("network unreachable"));
        assert!(!gathered.all_failed());
    }

    #[tokio::test]
    async fn all_failed_only_when_every_adapter_failed() {
        let gathered = gather(&[
            stub(Platform::Devfolio, &[], 0, true),
            stub(Platform::Unstop, &[], 0, true),
        ])
        .await;
        assert!(gathered.all_failed());
        assert!(gathered.events.is_empty());

        // Succeeding with nothing is not a failure.
        let empty = gather(&[stub(Platform::Unstop, &[], 0, false)]).await;
        assert!(!empty.all_failed());

        assert!(!gather(&[]).await.all_failed());
    }

    #[tokio::test]
    async fn adapters_run_concurrently() {
        let started = tokio::time::Instant::now();
        gather(&[
            stub(Platform::CodeChef, &[1], 200, false),
            stub(Platform::Codeforces, &[2], 200, false),
        ])
        .await;
        assert!(started.elapsed() < Duration::from_millis(390));
    }
}
