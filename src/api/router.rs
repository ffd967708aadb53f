//! Blood report API router.
//!
//! Routes are nested under `/api/blood-report/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Extension(ApiContext) → 2. Client identity → 3. Rate limiter → handler
//!
//! Body limit and CORS wrap the whole router.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::AppConfig;

pub const API_PREFIX: &str = "/api/blood-report";

/// Build the API router from a pre-constructed `ApiContext`.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(ctx: ApiContext, config: &AppConfig) -> Router {
    // Layers run bottom (outermost) to top (innermost).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/upload", post(endpoints::reports::upload))
        .route("/analyze-text", post(endpoints::reports::analyze_text))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::middleware::from_fn(middleware::client::identify))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest(API_PREFIX, routes)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origin))
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => base.allow_origin(origin),
        Err(e) => {
            tracing::warn!(
                origin = allowed_origin,
                error = %e,
                "Invalid allowed origin, cross-origin requests will be refused"
            );
            base
        }
    }
}
