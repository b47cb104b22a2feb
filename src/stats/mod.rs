//! Tier Statistics
//!
//! Hit/miss accounting for the simulated hierarchy:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  StatsAggregator                      │
//! ├──────────────────────────────────────────────────────┤
//! │  overall   │  L1-0 … L1-n      │  L2-0 … L2-m          │
//! │  (Mutex)   │  (Mutex per node) │  (Mutex per node)     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Counters are updated once per completed fetch; ratios are derived on
//! demand by [`StatsAggregator::report`].

pub mod aggregator;
pub mod report;
pub mod tier;

pub use aggregator::{StatsAggregator, TierSelector};
pub use report::{StatsReport, TierReport};
pub use tier::{TierCounters, TierStats};
