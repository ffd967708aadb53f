//! Per-client upload serialization.
//!
//! A report analysis can take tens of seconds (text extraction plus a call
//! to the narrative provider). A client that double-submits must not start a
//! second analysis while the first is still running, so every analysis runs
//! inside an upload slot keyed by the client identifier.
//!
//! **Design**:
//! - `UploadGuard` lives in the API context (shared via `Arc`)
//! - `start_upload()` is a single check-and-insert under the table lock
//! - `complete_upload()` removes the slot only if the request id still matches,
//!   so a slow request cannot clear a newer one that started after a forced cleanup
//! - `try_acquire()` wraps both in an RAII `UploadSlot` that completes on drop
//! - Different identifiers never contend beyond the brief table lock

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ═══════════════════════════════════════════════════════════
// UploadGuard
// ═══════════════════════════════════════════════════════════

/// Table of identifier → in-flight request id.
#[derive(Debug, Default)]
pub struct UploadGuard {
    active: Mutex<HashMap<String, String>>,
}

impl UploadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `identifier`. Returns `false` if another request
    /// already holds it.
    pub fn start_upload(&self, identifier: &str, request_id: &str) -> bool {
        match self.table().entry(identifier.to_string()) {
            Entry::Occupied(existing) => {
                tracing::warn!(
                    identifier,
                    request_id,
                    active_request_id = %existing.get(),
                    "Upload rejected: another upload is in progress"
                );
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(request_id.to_string());
                tracing::debug!(identifier, request_id, "Upload slot claimed");
                true
            }
        }
    }

    /// Release the slot if it is still held by `request_id`. Returns whether
    /// anything was removed.
    pub fn complete_upload(&self, identifier: &str, request_id: &str) -> bool {
        let mut table = self.table();
        match table.get(identifier) {
            Some(active) if active == request_id => {
                table.remove(identifier);
                tracing::debug!(identifier, request_id, "Upload slot released");
                true
            }
            _ => false,
        }
    }

    pub fn is_upload_in_progress(&self, identifier: &str) -> bool {
        self.table().contains_key(identifier)
    }

    pub fn active_request_id(&self, identifier: &str) -> Option<String> {
        self.table().get(identifier).cloned()
    }

    /// Remove the slot unconditionally. For error paths that could not
    /// complete normally.
    pub fn force_cleanup(&self, identifier: &str) -> bool {
        let removed = self.table().remove(identifier);
        if let Some(request_id) = &removed {
            tracing::warn!(identifier, request_id = %request_id, "Upload slot force-cleared");
        }
        removed.is_some()
    }

    pub fn active_upload_count(&self) -> usize {
        self.table().len()
    }

    /// Claim the slot and return a guard that completes it on drop.
    ///
    /// Returns `None` if the identifier is busy.
    pub fn try_acquire(
        self: &Arc<Self>,
        identifier: &str,
        request_id: &str,
    ) -> Option<UploadSlot> {
        if !self.start_upload(identifier, request_id) {
            return None;
        }
        Some(UploadSlot {
            guard: Arc::clone(self),
            identifier: identifier.to_string(),
            request_id: request_id.to_string(),
        })
    }

    // Every operation is a single map call under the lock, so the table is
    // consistent even if a holder panicked.
    fn table(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ═══════════════════════════════════════════════════════════
// UploadSlot: RAII in-flight marker
// ═══════════════════════════════════════════════════════════

/// Held for the whole analysis. Dropping it calls `complete_upload` with
/// the request id that claimed the slot.
#[derive(Debug)]
pub struct UploadSlot {
    guard: Arc<UploadGuard>,
    identifier: String,
    request_id: String,
}

impl UploadSlot {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Drop for UploadSlot {
    fn drop(&mut self) {
        self.guard.complete_upload(&self.identifier, &self.request_id);
    }
}
