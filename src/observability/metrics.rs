//! Engine counters
//!
//! Counters only, monotonic, reset on process start. Relaxed atomics: exact
//! totals, no cross-counter ordering.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    auto_status_updates: AtomicU64,
    transition_noops: AtomicU64,
    request_status_changes: AtomicU64,
    activations: AtomicU64,
    supersessions: AtomicU64,
    versions_created: AtomicU64,
    versions_deleted: AtomicU64,
    guard_denials: AtomicU64,
    persistence_failures: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_auto_status_updates(&self, n: u64) {
        self.auto_status_updates.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_transition_noops(&self, n: u64) {
        self.transition_noops.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_request_status_changes(&self) {
        self.request_status_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_activations(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_supersessions(&self) {
        self.supersessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_versions_created(&self) {
        self.versions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_versions_deleted(&self) {
        self.versions_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_guard_denials(&self) {
        self.guard_denials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_persistence_failures(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            auto_status_updates: self.auto_status_updates.load(Ordering::Relaxed),
            transition_noops: self.transition_noops.load(Ordering::Relaxed),
            request_status_changes: self.request_status_changes.load(Ordering::Relaxed),
            activations: self.activations.load(Ordering::Relaxed),
            supersessions: self.supersessions.load(Ordering::Relaxed),
            versions_created: self.versions_created.load(Ordering::Relaxed),
            versions_deleted: self.versions_deleted.load(Ordering::Relaxed),
            guard_denials: self.guard_denials.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub auto_status_updates: u64,
    pub transition_noops: u64,
    pub request_status_changes: u64,
    pub activations: u64,
    pub supersessions: u64,
    pub versions_created: u64,
    pub versions_deleted: u64,
    pub guard_denials: u64,
    pub persistence_failures: u64,
}
