//! Origin Server
//!
//! Binds the origin router and serves it until shutdown.

use super::enforcement::L2EnforcementMap;
use super::handlers::OriginRouter;
use crate::error::{Error, Result};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{lookup_host, TcpListener};
use tokio::sync::broadcast;
use tracing::info;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the origin server
#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// Host to bind; empty means all interfaces
    pub addr: String,
    /// Port to bind; must be non-zero
    pub port: u16,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            port: 8080,
        }
    }
}

impl OriginConfig {
    /// Reject configurations the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Configuration("missing port value".into()));
        }
        let host = self.addr.trim_start_matches('[').trim_end_matches(']');
        if host.parse::<IpAddr>().is_err() && !is_hostname(host) {
            return Err(Error::Configuration(format!(
                "Invalid origin address {:?}",
                self.addr
            )));
        }
        Ok(())
    }

    /// `host:port` bind target; IPv6 literals are bracketed
    pub fn bind_target(&self) -> String {
        let host = self.addr.trim_start_matches('[').trim_end_matches(']');
        match host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.port),
            Ok(IpAddr::V4(ip)) => format!("{}:{}", ip, self.port),
            Err(_) if host.is_empty() => format!("0.0.0.0:{}", self.port),
            Err(_) => format!("{}:{}", host, self.port),
        }
    }

    /// Resolve the bind target to its first socket address
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let target = self.bind_target();
        let mut addrs = lookup_host(&target).await.map_err(|e| {
            Error::Configuration(format!("Failed to resolve origin address {}: {}", target, e))
        })?;
        addrs.next().ok_or_else(|| {
            Error::Configuration(format!("Origin address {} resolved to nothing", target))
        })
    }
}

/// Empty, or dot-separated labels of alphanumerics and hyphens
fn is_hostname(host: &str) -> bool {
    host.is_empty()
        || host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

// =============================================================================
// Origin Server
// =============================================================================

/// Simulated origin holding the L2 enforcement state
#[derive(Debug)]
pub struct OriginServer {
    config: OriginConfig,
    enforcement: Arc<L2EnforcementMap>,
    shutdown_tx: broadcast::Sender<()>,
}

impl OriginServer {
    /// Create a new origin server; fails on invalid configuration
    pub fn new(config: OriginConfig) -> Result<Self> {
        config.validate()?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            enforcement: Arc::new(L2EnforcementMap::new()),
            shutdown_tx,
        })
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let addr = self.config.resolve().await?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            Error::Internal(format!("Failed to bind origin server on {}: {}", addr, e))
        })?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let app = OriginRouter::new(self.enforcement.clone()).build();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(addr = ?listener.local_addr().ok(), "Start origin server");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Origin server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("Origin server error: {}", e)))?;

        Ok(())
    }

    /// Enforcement state shared with the handlers
    pub fn enforcement(&self) -> Arc<L2EnforcementMap> {
        self.enforcement.clone()
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
