//! Resolves the caller's identity for rate limiting and upload serialization.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::ClientIdentity;

const FORWARDED_FOR: &str = "X-Forwarded-For";
const UNKNOWN_CLIENT: &str = "unknown";

/// First `X-Forwarded-For` entry, else the peer address, else `"unknown"`.
pub fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(first), _) => first.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => UNKNOWN_CLIENT.to_string(),
    }
}

/// Inject `ClientIdentity` into request extensions.
pub async fn identify(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let identity = ClientIdentity(client_identifier(req.headers(), peer));
    req.extensions_mut().insert(identity);

    next.run(req).await
}
