use crate::cache::CacheOutcome;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

///
/// AggregateMetrics
///
/// Ephemeral, in-memory counters for one loader scope.
///
/// `grouped_executions` is the observable at-most-once counter: for any
/// descriptor it advances exactly once per batch no matter how many parents
/// read the result. `fallback_materializations` counts the deliberate N+1
/// escapes (per-row blocks and enumeration).
///

#[derive(Debug, Default)]
pub struct AggregateMetrics {
    grouped_executions: AtomicU64,
    shared_reads: AtomicU64,
    fallback_materializations: AtomicU64,
}

impl AggregateMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            grouped_executions: AtomicU64::new(0),
            shared_reads: AtomicU64::new(0),
            fallback_materializations: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_cache_outcome(&self, outcome: CacheOutcome) {
        match outcome {
            CacheOutcome::Computed => {
                self.grouped_executions.fetch_add(1, Ordering::Relaxed);
            }
            CacheOutcome::Shared => {
                self.shared_reads.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn record_fallback(&self) {
        self.fallback_materializations.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            grouped_executions: self.grouped_executions.load(Ordering::Relaxed),
            shared_reads: self.shared_reads.load(Ordering::Relaxed),
            fallback_materializations: self.fallback_materializations.load(Ordering::Relaxed),
        }
    }
}

///
/// MetricsSnapshot
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub grouped_executions: u64,
    pub shared_reads: u64,
    pub fallback_materializations: u64,
}
