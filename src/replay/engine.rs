//! Trace Replay Engine
//!
//! Reads a trace sequentially, routes each record, paces submission through
//! the admission controller and hands fetches to the worker pool. Completed
//! fetches feed the stats aggregator and the Prometheus metrics.

use super::admission::AdmissionController;
use super::client::{ObjectFetcher, OriginClient};
use super::config::ReplayConfig;
use super::dispatcher::Dispatcher;
use super::metrics::ReplayMetrics;
use crate::error::{ErrorAction, Result};
use crate::protocol::CacheRequestDirectives;
use crate::routing::{RouteDecision, TierRouter};
use crate::stats::StatsAggregator;
use crate::trace::{TraceReader, TraceRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncBufRead;
use tracing::{debug, error, info, warn};

// =============================================================================
// Replay Summary
// =============================================================================

/// Bookkeeping for one finished replay
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Trace lines consumed
    pub lines: u64,
    /// Records handed to the worker pool
    pub submitted: u64,
    /// Malformed records skipped
    pub skipped: u64,
}

impl ReplaySummary {
    fn empty() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            lines: 0,
            submitted: 0,
            skipped: 0,
        }
    }
}

// =============================================================================
// Replay Engine
// =============================================================================

/// Replays one trace against the L1 tier
pub struct ReplayEngine {
    config: ReplayConfig,
    router: TierRouter,
    endpoints: Vec<String>,
    fetcher: Arc<dyn ObjectFetcher>,
    stats: Arc<StatsAggregator>,
    metrics: Arc<ReplayMetrics>,
}

impl ReplayEngine {
    /// Create an engine fetching over HTTP
    pub fn new(config: ReplayConfig, metrics: Arc<ReplayMetrics>) -> Result<Self> {
        let client = OriginClient::new(config.worker_count())?;
        Self::with_fetcher(config, Arc::new(client), metrics)
    }

    /// Create an engine with a custom fetcher
    pub fn with_fetcher(
        config: ReplayConfig,
        fetcher: Arc<dyn ObjectFetcher>,
        metrics: Arc<ReplayMetrics>,
    ) -> Result<Self> {
        config.validate()?;

        let router = TierRouter::new(
            config.l1_addrs.len(),
            config.l2_addrs.len(),
            config.l1_policy,
        )?;
        let stats = Arc::new(StatsAggregator::new(router.num_l1(), router.num_l2()));

        Ok(Self {
            endpoints: config.l1_endpoints(),
            config,
            router,
            fetcher,
            stats,
            metrics,
        })
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Shared statistics; readable while a replay is running
    pub fn stats(&self) -> Arc<StatsAggregator> {
        self.stats.clone()
    }

    pub fn metrics(&self) -> Arc<ReplayMetrics> {
        self.metrics.clone()
    }

    /// Replay the configured trace file
    ///
    /// Without a trace file the replay is skipped and an empty summary is
    /// returned. A file that cannot be opened aborts the replay.
    pub async fn run(&self) -> Result<ReplaySummary> {
        let Some(path) = self.config.trace_file.as_ref() else {
            info!("No trace file configured, skipping replay");
            return Ok(ReplaySummary::empty());
        };

        let reader = match TraceReader::open(path).await {
            Ok(reader) => reader,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open trace file");
                return Err(e);
            }
        };

        self.replay(reader).await
    }

    /// Replay records from any trace source
    ///
    /// Every submitted fetch has completed by the time this returns,
    /// including when reading stopped on an IO error.
    pub async fn replay<R>(&self, mut reader: TraceReader<R>) -> Result<ReplaySummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let started_at = Utc::now();
        let admission = AdmissionController::new(self.config.admission_rate());
        let dispatcher = Dispatcher::new(self.config.worker_count());
        let limit = self.config.record_limit();

        info!(
            source = %reader.source(),
            l1_nodes = self.router.num_l1(),
            l2_nodes = self.router.num_l2(),
            policy = %self.router.policy(),
            workers = dispatcher.workers(),
            rate = admission.rate(),
            limit = ?limit,
            "Start replay"
        );

        let peeker = (!self.config.peek_interval.is_zero()).then(|| self.spawn_peeker());

        let outcome = loop {
            if limit.is_some_and(|limit| dispatcher.submitted() >= limit) {
                info!(submitted = dispatcher.submitted(), "Record limit reached");
                break Ok(());
            }

            let record = match reader.next_record().await {
                None => break Ok(()),
                Some(Ok(record)) => record,
                Some(Err(e)) if e.action() == ErrorAction::SkipRecord => {
                    warn!(error = %e, "Skipping trace record");
                    continue;
                }
                Some(Err(e)) => break Err(e),
            };

            let route = self.router.route(&record.object_id);
            admission.acquire().await;
            dispatcher.submit(self.fetch_task(record, route));
        };

        dispatcher.drain().await;
        if let Some(peeker) = peeker {
            peeker.abort();
        }

        let trace_stats = reader.stats();
        let summary = ReplaySummary {
            started_at,
            finished_at: Utc::now(),
            lines: trace_stats.lines,
            submitted: dispatcher.submitted(),
            skipped: trace_stats.skipped,
        };

        info!(
            lines = summary.lines,
            submitted = summary.submitted,
            skipped = summary.skipped,
            "Replay finished"
        );
        self.stats.report().log();

        match outcome {
            Ok(()) => Ok(summary),
            Err(e) => {
                error!(error = %e, submitted = summary.submitted, "Replay aborted");
                Err(e)
            }
        }
    }

    /// Log a stats report every peek interval until aborted
    fn spawn_peeker(&self) -> tokio::task::JoinHandle<()> {
        let stats = self.stats.clone();
        let period = self.config.peek_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("Peek stats");
                stats.report().log();
            }
        })
    }

    fn fetch_task(
        &self,
        record: TraceRecord,
        route: RouteDecision,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let fetcher = self.fetcher.clone();
        let stats = self.stats.clone();
        let metrics = self.metrics.clone();
        let endpoint = self.endpoints.get(route.l1).cloned();

        async move {
            let Some(endpoint) = endpoint else {
                error!(l1 = route.l1, "No endpoint for routed L1 node");
                return;
            };
            let directives = CacheRequestDirectives::store_all(route.l2);

            debug!(
                seq = record.sequence,
                id = %record.object_id,
                size = record.size_bytes,
                l1 = route.l1,
                l2 = route.l2,
                endpoint = %endpoint,
                "Sending request"
            );

            let start = Instant::now();
            let result = fetcher
                .fetch(&endpoint, &record.object_id, record.size_bytes, &directives)
                .await;
            let latency = start.elapsed();

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    metrics.record_fetch_error();
                    error!(
                        seq = record.sequence,
                        id = %record.object_id,
                        endpoint = %endpoint,
                        error = %e,
                        "Failed to get object"
                    );
                    return;
                }
            };

            if let Err(e) = outcome.signal.validate() {
                error!(seq = record.sequence, error = %e, "Unknown status received");
            }

            metrics.observe(outcome.signal.status.as_str(), latency);
            stats.record(route, record.size_bytes, &outcome.signal, latency);

            debug!(
                seq = record.sequence,
                status = %outcome.signal.status,
                node = %outcome.signal.node,
                latency = ?latency,
                "Received response"
            );
        }
    }
}

impl std::fmt::Debug for ReplayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayEngine")
            .field("config", &self.config)
            .field("router", &self.router)
            .finish()
    }
}
