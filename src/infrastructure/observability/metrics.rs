//! In-process counters exposed through the `/api/system/metrics` handler
//! (spec §4.11). The metrics vendor integration (`prometheus`) that the
//! teacher carried is dropped (see DESIGN.md); these are plain atomics
//! snapshotted into a serializable struct, which is all the HTTP facade's
//! JSON endpoint needs.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Metrics {
    pub jobs_succeeded: AtomicU64,
    pub jobs_failed: AtomicU64,
    pub trades_executed: AtomicU64,
    pub events_published: AtomicU64,
    pub events_dropped: AtomicU64,
    pub http_requests: AtomicU64,
    pub http_errors: AtomicU64,
    pub sequences_evaluated: AtomicU64,
    pub active_planner_runs: AtomicI64,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub trades_executed: u64,
    pub events_published: u64,
    pub events_dropped: u64,
    pub http_requests: u64,
    pub http_errors: u64,
    pub sequences_evaluated: u64,
    pub active_planner_runs: i64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            trades_executed: self.trades_executed.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            http_requests: self.http_requests.load(Ordering::Relaxed),
            http_errors: self.http_errors.load(Ordering::Relaxed),
            sequences_evaluated: self.sequences_evaluated.load(Ordering::Relaxed),
            active_planner_runs: self.active_planner_runs.load(Ordering::Relaxed),
        }
    }
}
