//! Per-client rate limiting middleware.
//!
//! Sliding-window limits per client (per-minute and per-hour budgets from
//! config). Health checks are never limited.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ClientIdentity};

pub const REMAINING_HEADER: &str = "X-Rate-Limit-Remaining";

/// Returns 429 if the client is over budget; otherwise tags the response
/// with the remaining budget. Reads `ApiContext` and `ClientIdentity` from
/// request extensions.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    if req.uri().path().ends_with("/health") {
        return Ok(next.run(req).await);
    }

    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let client = req
        .extensions()
        .get::<ClientIdentity>()
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // MutexGuard is !Send; must drop before .await via block scope
    let remaining = {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&client).map_err(|retry_after| {
            tracing::warn!(client = %client, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }
        })?
    };

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(REMAINING_HEADER, HeaderValue::from(remaining));
    Ok(response)
}
