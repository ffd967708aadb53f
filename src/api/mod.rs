//! HTTP API for blood report analysis.
//!
//! Routes are nested under `/api/blood-report/` and pass through a small
//! middleware stack: Client identity → Rate limit → Handler.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance. `start_server()` binds and serves it.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer, ServerError};
pub use types::ApiContext;
