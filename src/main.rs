//! CDN Tier Bench
//!
//! Two processes in one binary:
//!
//! ```text
//!   cdn-tier-bench origin  ──► simulated origin on :8080
//!   cdn-tier-bench replay  ──► trace replay against the L1 tier,
//!                              metrics and health on :9090
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cdn_tier_bench::replay::{parse_addr_list, run_metrics_server};
use cdn_tier_bench::{
    Error, L1Policy, OriginConfig, OriginServer, ReplayConfig, ReplayEngine, ReplayMetrics,
    Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// CDN Tier Bench - two-tier cache hierarchy benchmark
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    /// Runtime worker threads; 0 uses every available core
    #[arg(long, global = true, env = "CPUS", default_value = "0")]
    cpus: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the simulated origin server
    Origin(OriginArgs),
    /// Replay a trace against the L1 tier
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct OriginArgs {
    /// Host to bind; empty binds all interfaces
    #[arg(long, env = "ORIGIN_ADDR", default_value = "")]
    server_addr: String,

    /// Port to bind
    #[arg(long, env = "ORIGIN_PORT", default_value = "8080")]
    server_port: u16,
}

impl From<OriginArgs> for OriginConfig {
    fn from(args: OriginArgs) -> Self {
        OriginConfig {
            addr: args.server_addr,
            port: args.server_port,
        }
    }
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Metrics/health bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:9090")]
    server_addr: String,

    /// Comma-separated L1 node addresses
    #[arg(long, env = "L1_ADDRS", default_value = ":8080")]
    l1_addrs: String,

    /// Comma-separated L2 node addresses
    #[arg(long, env = "L2_ADDRS", default_value = ":8080")]
    l2_addrs: String,

    /// L1 selection policy (hash, random); anything else pins node 0
    #[arg(long, env = "L1_LB", default_value = "")]
    l1_lb: String,

    /// Trace file to replay
    #[arg(long, env = "TRACE_FILE")]
    trace_file: Option<PathBuf>,

    /// Worker pool size
    #[arg(long, env = "WORKERS", default_value = "2", allow_negative_numbers = true)]
    workers: i64,

    /// Requests admitted per second
    #[arg(long, env = "IOPS", default_value = "1")]
    iops: u64,

    /// Maximum records to replay; negative replays the whole trace
    #[arg(long, env = "IO_REFS", default_value = "-1", allow_negative_numbers = true)]
    io_refs: i64,

    /// Seconds between mid-run stats reports; 0 disables them
    #[arg(long, env = "PEEK_INTERVAL_SECS", default_value = "900")]
    peek_interval_secs: u64,

    /// Print the final report as JSON on stdout
    #[arg(long, env = "REPORT_JSON")]
    report_json: bool,
}

impl From<&ReplayArgs> for ReplayConfig {
    fn from(args: &ReplayArgs) -> Self {
        ReplayConfig {
            metrics_addr: args.server_addr.clone(),
            l1_addrs: parse_addr_list(&args.l1_addrs),
            l2_addrs: parse_addr_list(&args.l2_addrs),
            l1_policy: args.l1_lb.parse::<L1Policy>().unwrap_or_default(),
            trace_file: args.trace_file.clone(),
            workers: args.workers,
            rate_per_sec: args.iops,
            record_cap: args.io_refs,
            peek_interval: Duration::from_secs(args.peek_interval_secs),
        }
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    info!("Starting CDN Tier Bench");
    info!("  Version: {}", cdn_tier_bench::VERSION);

    let runtime = build_runtime(cli.cpus)?;
    let outcome = runtime.block_on(async move {
        match cli.command {
            Command::Origin(args) => run_origin(args.into()).await,
            Command::Replay(args) => run_replay(args).await,
        }
    });

    if let Err(e) = &outcome {
        error!(error = %e, action = ?e.action(), "Fail to serve");
    }
    outcome
}

fn build_runtime(cpus: usize) -> Result<tokio::runtime::Runtime> {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if cpus > available {
        return Err(Error::Configuration(format!(
            "Only {} CPUs are available but {} is specified",
            available, cpus
        )));
    }

    let workers = if cpus == 0 { available } else { cpus };
    info!("  Worker threads: {}", workers);

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .map_err(Error::from)
}

// =============================================================================
// Origin
// =============================================================================

async fn run_origin(config: OriginConfig) -> Result<()> {
    let server = Arc::new(OriginServer::new(config)?);

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            signal_server.shutdown();
        }
    });

    server.run().await?;
    info!("Origin shutdown complete");
    Ok(())
}

// =============================================================================
// Replay
// =============================================================================

async fn run_replay(args: ReplayArgs) -> Result<()> {
    let config = ReplayConfig::from(&args);
    let metrics_addr = config.metrics_socket_addr()?;

    info!("  Metrics: {}", metrics_addr);
    info!("  L1 nodes: {:?}", config.l1_addrs);
    info!("  L2 nodes: {:?}", config.l2_addrs);
    info!("  L1 policy: {}", config.l1_policy);

    let metrics = Arc::new(ReplayMetrics::new()?);
    let engine = ReplayEngine::new(config, metrics.clone())?;
    let report_json = args.report_json;

    tokio::spawn(async move {
        match engine.run().await {
            Ok(summary) => {
                info!(
                    started_at = %summary.started_at,
                    finished_at = %summary.finished_at,
                    submitted = summary.submitted,
                    skipped = summary.skipped,
                    "Replay complete, metrics still served"
                );
                if report_json {
                    print_report(&summary, &engine.stats().report());
                }
            }
            Err(e) => {
                error!(error = %e, action = ?e.action(), "Replay stopped, metrics still served");
            }
        }
    });

    run_metrics_server(metrics_addr, metrics).await
}

fn print_report(
    summary: &cdn_tier_bench::ReplaySummary,
    report: &cdn_tier_bench::StatsReport,
) {
    let document = serde_json::json!({
        "summary": summary,
        "report": report,
    });
    match serde_json::to_string_pretty(&document) {
        Ok(text) => println!("{}", text),
        Err(e) => error!("Failed to serialize report: {}", e),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(cli: &Cli) {
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn", "tower=warn", "axum=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_defaults() {
        let cli = Cli::try_parse_from(["cdn-tier-bench", "replay"]).unwrap();
        let Command::Replay(args) = cli.command else {
            panic!("expected replay subcommand");
        };
        let config = ReplayConfig::from(&args);
        assert_eq!(config.metrics_addr, "0.0.0.0:9090");
        assert_eq!(config.l1_addrs, vec![":8080"]);
        assert_eq!(config.l1_policy, L1Policy::Unspecified);
        assert_eq!(config.workers, 2);
        assert_eq!(config.record_cap, -1);
        assert_eq!(config.peek_interval, Duration::from_secs(900));
        assert!(config.trace_file.is_none());
    }

    #[test]
    fn test_replay_flags() {
        let cli = Cli::try_parse_from([
            "cdn-tier-bench",
            "replay",
            "--l1-addrs",
            ":8081,:8082",
            "--l2-addrs",
            ":8091",
            "--l1-lb",
            "hash",
            "--io-refs",
            "-1",
            "--iops",
            "500",
            "--trace-file",
            "wiki.trace",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");

        let Command::Replay(args) = cli.command else {
            panic!("expected replay subcommand");
        };
        let config = ReplayConfig::from(&args);
        assert_eq!(config.l1_addrs, vec![":8081", ":8082"]);
        assert_eq!(config.l2_addrs, vec![":8091"]);
        assert_eq!(config.l1_policy, L1Policy::Hash);
        assert_eq!(config.rate_per_sec, 500);
        assert_eq!(config.record_limit(), None);
        assert_eq!(config.trace_file, Some(PathBuf::from("wiki.trace")));
    }

    #[test]
    fn test_origin_flags() {
        let cli =
            Cli::try_parse_from(["cdn-tier-bench", "origin", "--server-port", "9000"]).unwrap();
        let Command::Origin(args) = cli.command else {
            panic!("expected origin subcommand");
        };
        let config = OriginConfig::from(args);
        assert_eq!(config.port, 9000);
        assert!(config.addr.is_empty());
    }
}
