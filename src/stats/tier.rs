//! Per-tier counters

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

// =============================================================================
// Tier Counters
// =============================================================================

/// Raw counters for one tier instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierCounters {
    /// Requests attributed to this tier
    pub references: u64,
    /// Requests this tier could not satisfy
    pub misses: u64,
    /// Bytes requested through this tier
    pub byte_refs: u64,
    /// Bytes this tier could not satisfy
    pub byte_misses: u64,
    /// Sum of fetch latencies, nanoseconds
    pub latency_sum_nanos: u64,
    /// Sum of latencies of missed fetches, nanoseconds
    pub miss_latency_sum_nanos: u64,
}

impl TierCounters {
    /// Apply one completed fetch
    ///
    /// Counters saturate at `u64::MAX` instead of wrapping.
    #[inline]
    pub fn apply(&mut self, size_bytes: u64, missed: bool, latency_nanos: u64) {
        self.references = self.references.saturating_add(1);
        self.byte_refs = self.byte_refs.saturating_add(size_bytes);
        self.latency_sum_nanos = self.latency_sum_nanos.saturating_add(latency_nanos);
        if missed {
            self.misses = self.misses.saturating_add(1);
            self.byte_misses = self.byte_misses.saturating_add(size_bytes);
            self.miss_latency_sum_nanos = self.miss_latency_sum_nanos.saturating_add(latency_nanos);
        }
    }

    pub fn hits(&self) -> u64 {
        self.references.saturating_sub(self.misses)
    }

    pub fn byte_hits(&self) -> u64 {
        self.byte_refs.saturating_sub(self.byte_misses)
    }

    /// `misses / references`; NaN before the first reference
    pub fn miss_ratio(&self) -> f64 {
        self.misses as f64 / self.references as f64
    }

    /// `1 - misses / references`; NaN before the first reference
    pub fn hit_ratio(&self) -> f64 {
        1.0 - self.miss_ratio()
    }

    /// NaN until a non-empty object was referenced
    pub fn byte_miss_ratio(&self) -> f64 {
        self.byte_misses as f64 / self.byte_refs as f64
    }

    pub fn byte_hit_ratio(&self) -> f64 {
        1.0 - self.byte_miss_ratio()
    }

    /// Mean latency over all references, nanoseconds
    pub fn avg_latency_nanos(&self) -> f64 {
        self.latency_sum_nanos as f64 / self.references as f64
    }

    /// Mean latency over misses, nanoseconds; NaN without misses
    pub fn avg_miss_latency_nanos(&self) -> f64 {
        self.miss_latency_sum_nanos as f64 / self.misses as f64
    }

    /// Mean latency over hits, nanoseconds; NaN without hits
    pub fn avg_hit_latency_nanos(&self) -> f64 {
        (self.latency_sum_nanos - self.miss_latency_sum_nanos) as f64 / self.hits() as f64
    }
}

// =============================================================================
// Tier Stats
// =============================================================================

/// Counters for one tier instance behind their own lock
#[derive(Debug, Default)]
pub struct TierStats {
    counters: Mutex<TierCounters>,
}

impl TierStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed fetch under the lock
    pub fn record(&self, size_bytes: u64, missed: bool, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.counters.lock().apply(size_bytes, missed, nanos);
    }

    /// Copy the counters out under the lock
    pub fn snapshot(&self) -> TierCounters {
        *self.counters.lock()
    }
}
