//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::pipeline::analyzer::ReportAnalyzer;
use crate::upload_guard::UploadGuard;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Above this many tracked clients, idle windows are swept on insert.
const SWEEP_THRESHOLD: usize = 1024;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub analyzer: Arc<ReportAnalyzer>,
    pub upload_guard: Arc<UploadGuard>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(analyzer: ReportAnalyzer, config: &AppConfig) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            upload_guard: Arc::new(UploadGuard::new()),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
                config.rate_per_minute,
                config.rate_per_hour,
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Client identity: injected by the identify middleware
// ═══════════════════════════════════════════════════════════

/// Who is calling: first `X-Forwarded-For` entry, else the peer address,
/// else `"unknown"`. Keys both the rate limiter and the upload guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl ClientIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: sliding window per client
// ═══════════════════════════════════════════════════════════

/// Sliding-window limiter with a per-minute and a per-hour budget.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
}

impl RateLimiter {
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
        }
    }

    /// Record a request from `client`. Returns the requests left in the
    /// tighter window, or `Err(retry_after_secs)` if a limit is exceeded.
    pub fn check(&mut self, client: &str) -> Result<u32, u64> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&mut self, client: &str, now: Instant) -> Result<u32, u64> {
        if !self.windows.contains_key(client) && self.windows.len() >= SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let entries = self.windows.entry(client.to_string()).or_default();

        // Drop entries older than the hour window
        entries.retain(|ts| now.duration_since(*ts) < HOUR);

        let in_last_minute: Vec<&Instant> = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < MINUTE)
            .collect();
        if in_last_minute.len() as u32 >= self.per_minute {
            return Err(retry_after(in_last_minute.first().copied(), now, MINUTE));
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(retry_after(entries.first(), now, HOUR));
        }

        let minute_left = self.per_minute - in_last_minute.len() as u32 - 1;
        let hour_left = self.per_hour - entries.len() as u32 - 1;
        entries.push(now);

        Ok(minute_left.min(hour_left))
    }

    /// Forget clients with no requests in the last hour.
    fn sweep(&mut self, now: Instant) {
        self.windows.retain(|_, entries| {
            entries.retain(|ts| now.duration_since(*ts) < HOUR);
            !entries.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Seconds until the oldest entry leaves the window (at least 1).
fn retry_after(oldest: Option<&Instant>, now: Instant, window: Duration) -> u64 {
    let Some(oldest) = oldest else {
        return window.as_secs();
    };
    let remaining = window.saturating_sub(now.duration_since(*oldest));
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}
