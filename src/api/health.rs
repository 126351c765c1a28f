//! Shared health state for the /health endpoint.
//! Updated by the sampler, read by the API.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Sampler liveness counters. A stale `last_sample_ts` means passes are
/// failing to persist or the sampler has stopped.
#[derive(Default)]
pub struct HealthState {
    /// Completed sample passes since process start.
    pub passes_completed: AtomicU64,
    /// Total samples written across all passes.
    pub samples_persisted: AtomicU64,
    /// Unix seconds of the last persisted pass (0 = none yet).
    pub last_sample_ts: AtomicI64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&self, ts: i64, samples: u64) {
        self.passes_completed.fetch_add(1, Ordering::Relaxed);
        self.samples_persisted.fetch_add(samples, Ordering::Relaxed);
        self.last_sample_ts.store(ts, Ordering::Relaxed);
    }

    pub fn passes_completed(&self) -> u64 {
        self.passes_completed.load(Ordering::Relaxed)
    }

    pub fn samples_persisted(&self) -> u64 {
        self.samples_persisted.load(Ordering::Relaxed)
    }

    pub fn last_sample_ts(&self) -> i64 {
        self.last_sample_ts.load(Ordering::Relaxed)
    }
}
