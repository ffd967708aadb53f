//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Client identification: resolves the caller, stored as `ClientIdentity`
//! 2. Rate limiter: per-client sliding windows, health checks exempt

pub mod client;
pub mod rate;
