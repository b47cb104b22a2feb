//! CDN Tier Bench - Two-Tier Cache Hierarchy Benchmark
//!
//! Replays object-access traces against an L1/L2 cache hierarchy and
//! reports hit/miss statistics per tier, with a simulated origin behind it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          Trace Replay Engine                                 │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │  Trace Reader   │  │   Tier Router   │  │   Admission + Worker Pool   │  │
//! │  │  (lazy, 1-pass) │  │  (murmur3 hash) │  │   (token bucket, N tasks)   │  │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────┬───────────────┘  │
//! │           │                    │                         │                   │
//! │           └────────────────────┼─────────────────────────┘                   │
//! │                                │                                             │
//! │                    ┌───────────┴───────────┐                                │
//! │                    │   Stats Aggregator    │                                │
//! │                    │  (overall / L1 / L2)  │                                │
//! │                    └───────────────────────┘                                │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                          Cache Hierarchy (external)                          │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │    L1 nodes     │─►│    L2 nodes     │─►│     Origin Simulator        │  │
//! │  │                 │  │                 │  │   (L2 enforcement map)      │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`replay`]: Replay engine, HTTP client, worker pool, and metrics
//! - [`origin`]: Simulated origin server
//! - [`routing`]: Object → (L1, L2) node routing
//! - [`stats`]: Per-tier hit/miss accounting
//! - [`protocol`]: Cache header directives and result signals
//! - [`trace`]: Trace file parsing
//! - [`error`]: Error types and handling

pub mod error;
pub mod origin;
pub mod protocol;
pub mod replay;
pub mod routing;
pub mod stats;
pub mod trace;

// Re-export commonly used types
pub use error::{Error, ErrorAction, Result};

pub use origin::{L2EnforcementMap, OriginConfig, OriginRouter, OriginServer};

pub use protocol::{CacheNode, CacheRequestDirectives, CacheResultSignal, CacheStatus};

pub use replay::{
    OriginClient, ReplayConfig, ReplayEngine, ReplayMetrics, ReplaySummary,
};

pub use routing::{L1Policy, RouteDecision, TierRouter};

pub use stats::{StatsAggregator, StatsReport, TierCounters, TierReport, TierSelector};

pub use trace::{TraceReader, TraceRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
