use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::{AppError, AppResult};

/// Read-only access to the third-party JSON APIs.
///
/// Adapters only ever talk to upstreams through this trait, so tests can swap
/// in canned payloads.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issue one unauthenticated GET and decode the body as JSON.
    ///
    /// Transport failures, non-2xx statuses and undecodable bodies are all
    /// errors. There are no retries: one attempt per request cycle.
    async fn get_json(&self, url: &str) -> AppResult<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn get_json(&self, url: &str) -> AppResult<Value> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let snippet: String = error_text.chars().take(200).collect();
            return Err(AppError::Upstream(format!(
                "GET {} returned {}: {}",
                url, status, snippet
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to decode body of {}: {}", url, e)))
    }
}
