//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

pub const HEALTH_MESSAGE: &str = "Blood Report Analyzer API is running";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub active_uploads: usize,
}

/// `GET /api/blood-report/health`: liveness check. Not rate limited.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: HEALTH_MESSAGE,
        version: crate::config::APP_VERSION,
        active_uploads: ctx.upload_guard.active_upload_count(),
    })
}
