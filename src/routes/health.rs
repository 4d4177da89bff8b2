use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::models::Platform;
use crate::services::dates;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    /// Platforms the feeds are aggregated from.
    pub sources: Vec<Platform>,
}

/// Liveness only. Upstreams are not probed.
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: dates::canonical_iso(&chrono::Utc::now()),
        sources: Platform::ALL.to_vec(),
    };

    (StatusCode::OK, Json(response))
}
