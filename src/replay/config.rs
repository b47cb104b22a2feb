//! Replay engine configuration

use crate::error::{Error, Result};
use crate::routing::L1Policy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default interval between mid-run stats peeks
pub const DEFAULT_PEEK_INTERVAL: Duration = Duration::from_secs(900);

/// Configuration for a replay run
///
/// Fields hold the values as configured; the accessor methods apply the
/// normalization rules (rate 0 → 1, workers 0 → 1, negative cap → unbounded).
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Bind address of the metrics/health surface
    pub metrics_addr: String,
    /// L1 node addresses, indexed by routing decision
    pub l1_addrs: Vec<String>,
    /// L2 node addresses; only their count matters to routing
    pub l2_addrs: Vec<String>,
    /// L1 selection policy
    pub l1_policy: L1Policy,
    /// Trace to replay; `None` skips the replay
    pub trace_file: Option<PathBuf>,
    /// Worker pool size; negative is rejected
    pub workers: i64,
    /// Admission rate in requests per second
    pub rate_per_sec: u64,
    /// Maximum records to submit; negative means unbounded
    pub record_cap: i64,
    /// Interval between mid-run stats peeks
    pub peek_interval: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            metrics_addr: "0.0.0.0:9090".to_string(),
            l1_addrs: vec![":8080".to_string()],
            l2_addrs: vec![":8080".to_string()],
            l1_policy: L1Policy::Unspecified,
            trace_file: None,
            workers: 2,
            rate_per_sec: 1,
            record_cap: -1,
            peek_interval: DEFAULT_PEEK_INTERVAL,
        }
    }
}

impl ReplayConfig {
    /// Reject configurations the engine cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.metrics_addr.trim().is_empty() {
            return Err(Error::Configuration("missing addr value".into()));
        }
        self.metrics_socket_addr()?;

        if self.workers < 0 {
            return Err(Error::Configuration(format!(
                "invalid workers value: {}",
                self.workers
            )));
        }
        if self.l1_addrs.is_empty() {
            return Err(Error::Configuration("at least one L1 node is required".into()));
        }
        if self.l2_addrs.is_empty() {
            return Err(Error::Configuration("at least one L2 node is required".into()));
        }
        if let Some(addr) = self.l1_addrs.iter().find(|a| a.trim().is_empty()) {
            return Err(Error::Configuration(format!("empty L1 address {:?}", addr)));
        }
        Ok(())
    }

    /// Metrics bind address; a bare `:port` binds all interfaces
    pub fn metrics_socket_addr(&self) -> Result<SocketAddr> {
        let addr = self.metrics_addr.trim();
        let addr = if addr.starts_with(':') {
            format!("0.0.0.0{}", addr)
        } else {
            addr.to_string()
        };
        addr.parse().map_err(|e| {
            Error::Configuration(format!("Invalid metrics address {:?}: {}", self.metrics_addr, e))
        })
    }

    /// Worker pool size, at least one
    pub fn worker_count(&self) -> usize {
        usize::try_from(self.workers).unwrap_or(0).max(1)
    }

    /// Admission rate, at least one per second
    pub fn admission_rate(&self) -> u32 {
        u32::try_from(self.rate_per_sec).unwrap_or(u32::MAX).max(1)
    }

    /// Submission cap, `None` when unbounded
    pub fn record_limit(&self) -> Option<u64> {
        u64::try_from(self.record_cap).ok()
    }

    /// L1 endpoints as base URLs
    pub fn l1_endpoints(&self) -> Vec<String> {
        self.l1_addrs.iter().map(|a| normalize_endpoint(a)).collect()
    }
}

/// Turn a node address into a base URL
///
/// `:8080` → `http://127.0.0.1:8080`, `host:8080` → `http://host:8080`;
/// addresses with a scheme are kept as given.
pub fn normalize_endpoint(addr: &str) -> String {
    let addr = addr.trim().trim_end_matches('/');
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else if addr.starts_with(':') {
        format!("http://127.0.0.1{}", addr)
    } else {
        format!("http://{}", addr)
    }
}

/// Split a comma-separated address list, dropping blanks
pub fn parse_addr_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}
