//! Derived statistics reports

use super::aggregator::TierSelector;
use super::tier::TierCounters;
use serde::Serialize;
use tracing::info;

/// Counters plus derived ratios for one tier instance
///
/// Ratios with a zero denominator are NaN (serialized as `null`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierReport {
    pub tier: String,
    pub counters: TierCounters,
    pub hits: u64,
    pub byte_hits: u64,
    pub hit_ratio: f64,
    pub miss_ratio: f64,
    pub byte_hit_ratio: f64,
    pub byte_miss_ratio: f64,
    pub avg_latency_nanos: f64,
    pub avg_hit_latency_nanos: f64,
    pub avg_miss_latency_nanos: f64,
}

impl TierReport {
    pub fn new(selector: TierSelector, counters: TierCounters) -> Self {
        Self {
            tier: selector.to_string(),
            hits: counters.hits(),
            byte_hits: counters.byte_hits(),
            hit_ratio: counters.hit_ratio(),
            miss_ratio: counters.miss_ratio(),
            byte_hit_ratio: counters.byte_hit_ratio(),
            byte_miss_ratio: counters.byte_miss_ratio(),
            avg_latency_nanos: counters.avg_latency_nanos(),
            avg_hit_latency_nanos: counters.avg_hit_latency_nanos(),
            avg_miss_latency_nanos: counters.avg_miss_latency_nanos(),
            counters,
        }
    }

    fn log(&self) {
        info!(
            tier = %self.tier,
            refs = self.counters.references,
            byte_refs = self.counters.byte_refs,
            misses = self.counters.misses,
            byte_misses = self.counters.byte_misses,
            hits = self.hits,
            byte_hits = self.byte_hits,
            miss_ratio = self.miss_ratio,
            byte_miss_ratio = self.byte_miss_ratio,
            avg_latency_ns = self.avg_latency_nanos,
            avg_miss_latency_ns = self.avg_miss_latency_nanos,
            avg_hit_latency_ns = self.avg_hit_latency_nanos,
            "Tier stats"
        );
    }
}

/// Report across the whole hierarchy
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub overall: TierReport,
    pub l1: Vec<TierReport>,
    pub l2: Vec<TierReport>,
}

impl StatsReport {
    /// Emit one log line per tier instance
    pub fn log(&self) {
        self.overall.log();
        for tier in self.l1.iter().chain(self.l2.iter()) {
            tier.log();
        }
    }

    /// All rows, overall first
    pub fn tiers(&self) -> impl Iterator<Item = &TierReport> {
        std::iter::once(&self.overall)
            .chain(self.l1.iter())
            .chain(self.l2.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_labels_and_json() {
        let mut counters = TierCounters::default();
        counters.apply(100, true, 1_000);

        let report = StatsReport {
            overall: TierReport::new(TierSelector::Overall, counters),
            l1: vec![TierReport::new(TierSelector::L1(0), counters)],
            l2: vec![TierReport::new(TierSelector::L2(1), TierCounters::default())],
        };

        let labels: Vec<&str> = report.tiers().map(|t| t.tier.as_str()).collect();
        assert_eq!(labels, vec!["overall", "L1-0", "L2-1"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overall"]["counters"]["misses"], 1);
        assert_eq!(json["overall"]["missRatio"], 1.0);
        // NaN has no JSON representation
        assert!(json["l2"][0]["missRatio"].is_null());
    }
}
