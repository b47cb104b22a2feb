//! Hierarchy-wide statistics aggregator

use super::report::{StatsReport, TierReport};
use super::tier::TierStats;
use crate::protocol::CacheResultSignal;
use crate::routing::RouteDecision;
use std::time::Duration;
use tracing::warn;

/// Which counter set a report row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierSelector {
    Overall,
    L1(usize),
    L2(usize),
}

impl std::fmt::Display for TierSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierSelector::Overall => write!(f, "overall"),
            TierSelector::L1(i) => write!(f, "L1-{}", i),
            TierSelector::L2(i) => write!(f, "L2-{}", i),
        }
    }
}

/// Overall, per-L1-node and per-L2-node counters
///
/// Every instance is created up front and lives for the whole run; each has
/// its own lock, so fetches for different nodes never contend.
#[derive(Debug)]
pub struct StatsAggregator {
    overall: TierStats,
    l1: Vec<TierStats>,
    l2: Vec<TierStats>,
}

impl StatsAggregator {
    pub fn new(num_l1: usize, num_l2: usize) -> Self {
        Self {
            overall: TierStats::new(),
            l1: (0..num_l1).map(|_| TierStats::new()).collect(),
            l2: (0..num_l2).map(|_| TierStats::new()).collect(),
        }
    }

    /// Attribute one completed fetch
    ///
    /// The overall and L1 instances see every fetch. L1 counts a miss when
    /// the hierarchy missed or L2 answered. L2 is only charged when the
    /// request went past L1, and counts a miss only on a full miss.
    pub fn record(
        &self,
        route: RouteDecision,
        size_bytes: u64,
        signal: &CacheResultSignal,
        latency: Duration,
    ) {
        let missed = signal.is_miss();
        let missed_l1 = signal.missed_l1();

        self.overall.record(size_bytes, missed, latency);

        match self.l1.get(route.l1) {
            Some(tier) => tier.record(size_bytes, missed_l1, latency),
            None => warn!(l1 = route.l1, "L1 index out of range, sample not attributed"),
        }

        if missed_l1 {
            match self.l2.get(route.l2) {
                Some(tier) => tier.record(size_bytes, missed, latency),
                None => warn!(l2 = route.l2, "L2 index out of range, sample not attributed"),
            }
        }
    }

    /// Counter set for a selector
    pub fn tier(&self, selector: TierSelector) -> Option<&TierStats> {
        match selector {
            TierSelector::Overall => Some(&self.overall),
            TierSelector::L1(i) => self.l1.get(i),
            TierSelector::L2(i) => self.l2.get(i),
        }
    }

    /// Derive ratios for every instance
    ///
    /// Each lock is taken once; the report is not an atomic cut across tiers
    /// and may be taken while fetches are still completing.
    pub fn report(&self) -> StatsReport {
        StatsReport {
            overall: TierReport::new(TierSelector::Overall, self.overall.snapshot()),
            l1: self
                .l1
                .iter()
                .enumerate()
                .map(|(i, t)| TierReport::new(TierSelector::L1(i), t.snapshot()))
                .collect(),
            l2: self
                .l2
                .iter()
                .enumerate()
                .map(|(i, t)| TierReport::new(TierSelector::L2(i), t.snapshot()))
                .collect(),
        }
    }

    pub fn num_l1(&self) -> usize {
        self.l1.len()
    }

    pub fn num_l2(&self) -> usize {
        self.l2.len()
    }
}
