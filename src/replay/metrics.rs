//! Prometheus metrics for the replay process
//!
//! Metrics live in a registry owned by [`ReplayMetrics`] rather than the
//! process-global default, so several engines can run in one process.

use crate::error::{Error, Result};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::{conn::AddrIncoming, Builder};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Path the metrics are served on
pub const METRICS_PATH: &str = "/client/metrics";

/// Path of the liveness check
pub const HEALTH_PATH: &str = "/healthz";

const LATENCY_BUCKETS_MS: [f64; 14] = [
    0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

/// Request counters and latency histogram
#[derive(Debug, Clone)]
pub struct ReplayMetrics {
    registry: Registry,
    requests: IntCounterVec,
    latency_ms: Histogram,
    fetch_errors: IntCounter,
}

impl ReplayMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("client_requests_total", "Number of HTTP requests by cache status"),
            &["status"],
        )?;
        let latency_ms = Histogram::with_opts(
            HistogramOpts::new("request_latency_ms", "Histogram of latencies for HTTP requests")
                .buckets(LATENCY_BUCKETS_MS.to_vec()),
        )?;
        let fetch_errors = IntCounter::new(
            "client_fetch_errors_total",
            "Number of fetches that failed before a response arrived",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency_ms.clone()))?;
        registry.register(Box::new(fetch_errors.clone()))?;

        Ok(Self {
            registry,
            requests,
            latency_ms,
            fetch_errors,
        })
    }

    /// Count a completed request under its `X-Cache-Status` label
    pub fn observe(&self, status: &str, latency: Duration) {
        self.requests.with_label_values(&[status]).inc();
        self.latency_ms.observe(latency.as_secs_f64() * 1000.0);
    }

    /// Count a fetch that never produced a response
    pub fn record_fetch_error(&self) {
        self.fetch_errors.inc();
    }

    pub fn requests_total(&self, status: &str) -> u64 {
        self.requests.with_label_values(&[status]).get()
    }

    pub fn fetch_errors_total(&self) -> u64 {
        self.fetch_errors.get()
    }

    pub fn latency_samples(&self) -> u64 {
        self.latency_ms.get_sample_count()
    }

    /// Render every metric in the Prometheus text format
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

// =============================================================================
// Metrics Server
// =============================================================================

/// Serve the metrics and health endpoints until the process exits
pub async fn run_metrics_server(addr: SocketAddr, metrics: Arc<ReplayMetrics>) -> Result<()> {
    let builder = Server::try_bind(&addr)
        .map_err(|e| Error::Internal(format!("Failed to bind metrics server on {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    serve_with(builder, metrics, std::future::pending()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve_metrics<F>(
    listener: std::net::TcpListener,
    metrics: Arc<ReplayMetrics>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let builder = Server::from_tcp(listener)
        .map_err(|e| Error::Internal(format!("Failed to adopt metrics listener: {}", e)))?;

    serve_with(builder, metrics, shutdown).await
}

async fn serve_with<F>(
    builder: Builder<AddrIncoming>,
    metrics: Arc<ReplayMetrics>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let make_svc = make_service_fn(move |_conn| {
        let metrics = metrics.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let metrics = metrics.clone();
                async move { Ok::<_, Infallible>(respond(&req, &metrics)) }
            }))
        }
    });

    builder
        .serve(make_svc)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))
}

fn respond(req: &Request<Body>, metrics: &ReplayMetrics) -> Response<Body> {
    match req.uri().path() {
        METRICS_PATH => match metrics.encode() {
            Ok(buffer) => {
                let mut response = Response::new(Body::from(buffer));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(prometheus::TEXT_FORMAT));
                response
            }
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                with_status(StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable")
            }
        },
        HEALTH_PATH => with_status(StatusCode::OK, "ok"),
        _ => with_status(StatusCode::NOT_FOUND, "not found"),
    }
}

fn with_status(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}
