//! Trace Replay
//!
//! Client side of the benchmark:
//!
//! ```text
//!  trace file ──► TraceReader ──► TierRouter ──► AdmissionController
//!                                                      │
//!                                                      ▼
//!  StatsAggregator ◄── fetch task ◄────────────── Dispatcher (N workers)
//!  ReplayMetrics   ◄──     │
//!                          └──► L1 node ──► L2 node ──► origin
//! ```
//!
//! Reading, routing and admission run sequentially in trace order; fetches
//! complete in any order.

pub mod admission;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod metrics;

pub use admission::AdmissionController;
pub use client::{FetchOutcome, ObjectFetcher, OriginClient};
pub use config::{normalize_endpoint, parse_addr_list, ReplayConfig, DEFAULT_PEEK_INTERVAL};
pub use dispatcher::Dispatcher;
pub use engine::{ReplayEngine, ReplaySummary};
pub use metrics::{run_metrics_server, serve_metrics, ReplayMetrics, HEALTH_PATH, METRICS_PATH};
