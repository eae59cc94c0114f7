//! tiercache workload driver
//!
//! Runs a synthetic read-through workload against a [`TieredCache`] with
//! background maintenance enabled, logging statistics as it goes.
//!
//! Keys are derived the way a real caller would: a continuous timestamp is
//! bucketed to a coarser granularity so nearby requests share an entry, and
//! a pure `compute` function fills misses.
//!
//! ```text
//! timestamp ──bucket──▶ key ──get──▶ hit ──────────────▶ value
//!                                └─miss──▶ compute(key) ──set──┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use prometheus::Registry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tiercache::config::parse_duration;
use tiercache::{monitoring, CacheCollector, CacheConfig, CacheStatistics, TieredCache};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Drive a three-tier cache with a synthetic workload
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "TIERCACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Hot tier capacity (overrides config)
    #[arg(long, env = "TIERCACHE_HOT_CAPACITY")]
    hot_capacity: Option<usize>,

    /// Warm tier capacity (overrides config)
    #[arg(long, env = "TIERCACHE_WARM_CAPACITY")]
    warm_capacity: Option<usize>,

    /// Cold tier capacity (overrides config)
    #[arg(long, env = "TIERCACHE_COLD_CAPACITY")]
    cold_capacity: Option<usize>,

    /// Default entry TTL, e.g. "30s" or "5m" (overrides config)
    #[arg(long, env = "TIERCACHE_DEFAULT_TTL", value_parser = duration_arg)]
    default_ttl: Option<Duration>,

    /// Maintenance interval, e.g. "500ms" (overrides config)
    #[arg(long, env = "TIERCACHE_MAINTENANCE_INTERVAL", value_parser = duration_arg)]
    maintenance_interval: Option<Duration>,

    /// Number of lookups to perform
    #[arg(long, default_value = "100000")]
    operations: u64,

    /// Width of the simulated timestamp range, in seconds
    #[arg(long, default_value = "86400")]
    time_span_secs: u64,

    /// Timestamps within the same bucket share a cache entry
    #[arg(long, default_value = "60")]
    bucket_secs: u64,

    /// Statistics log interval
    #[arg(long, default_value = "1s", value_parser = duration_arg)]
    report_interval: Duration,

    /// Workload RNG seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

fn duration_arg(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

impl Args {
    fn cache_config(&self) -> Result<CacheConfig> {
        let mut config = match &self.config {
            Some(path) => CacheConfig::from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => CacheConfig::default(),
        };

        if let Some(hot) = self.hot_capacity {
            config.capacities.hot = hot;
        }
        if let Some(warm) = self.warm_capacity {
            config.capacities.warm = warm;
        }
        if let Some(cold) = self.cold_capacity {
            config.capacities.cold = cold;
        }
        if let Some(ttl) = self.default_ttl {
            config.default_ttl = ttl;
        }
        if let Some(interval) = self.maintenance_interval {
            config.maintenance_interval = interval;
        }

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = args.cache_config()?;
    info!("Starting tiercache {}", tiercache::VERSION);
    info!(
        "  Capacities: hot={} warm={} cold={}",
        config.capacities.hot, config.capacities.warm, config.capacities.cold
    );
    info!("  Default TTL: {:?}", config.default_ttl);
    info!("  Maintenance interval: {:?}", config.maintenance_interval);

    let cache = Arc::new(TieredCache::<f64>::with_config(config.clone())?);

    let registry = Registry::new();
    CacheCollector::new(cache.clone(), "tiercache")?.register(&registry)?;

    let maintenance = cache.start_maintenance(config.maintenance_interval)?;

    let cancel = CancellationToken::new();
    let workload = Workload {
        operations: args.operations,
        time_span_secs: args.time_span_secs.max(1),
        bucket_secs: args.bucket_secs.max(1),
        seed: args.seed,
    };

    let mut task = tokio::task::spawn_blocking({
        let cache = cache.clone();
        let cancel = cancel.clone();
        move || workload.run(&cache, &cancel)
    });

    let mut report = tokio::time::interval(args.report_interval);
    report.tick().await;

    let completed = loop {
        tokio::select! {
            result = &mut task => {
                break result.context("workload task panicked")?;
            }
            _ = report.tick() => {
                log_stats(&cache.stats());
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping workload");
                cancel.cancel();
            }
        }
    };

    maintenance.stop().await;

    let stats = cache.stats();
    info!(
        "Workload finished: {} lookups in {:?}",
        completed.lookups, completed.elapsed
    );
    log_stats(&stats);

    println!("{}", serde_json::to_string_pretty(&stats)?);
    print!("{}", monitoring::render(&registry)?);

    Ok(())
}

// =============================================================================
// Workload
// =============================================================================

struct Workload {
    operations: u64,
    time_span_secs: u64,
    bucket_secs: u64,
    seed: u64,
}

struct WorkloadSummary {
    lookups: u64,
    elapsed: Duration,
}

impl Workload {
    fn run(&self, cache: &TieredCache<f64>, cancel: &CancellationToken) -> WorkloadSummary {
        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut lookups = 0;

        for _ in 0..self.operations {
            if cancel.is_cancelled() {
                break;
            }

            let timestamp = self.sample_timestamp(&mut rng);
            let key = bucket_key(timestamp, self.bucket_secs);
            cache.get_or_insert_with(&key, None, compute_value);
            lookups += 1;
        }

        WorkloadSummary {
            lookups,
            elapsed: start.elapsed(),
        }
    }

    /// Skewed toward the start of the range so some buckets are much hotter
    fn sample_timestamp(&self, rng: &mut StdRng) -> u64 {
        let a = rng.gen_range(0..self.time_span_secs);
        let b = rng.gen_range(0..self.time_span_secs);
        a.min(b)
    }
}

/// Round a timestamp down to its bucket
fn bucket_key(timestamp_secs: u64, bucket_secs: u64) -> String {
    format!("t:{}", timestamp_secs / bucket_secs * bucket_secs)
}

/// Stand-in for an expensive pure computation keyed by bucket
fn compute_value(key: &str) -> f64 {
    let secs: f64 = key
        .strip_prefix("t:")
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    let mut acc = secs;
    for i in 1..=64 {
        acc = (acc / i as f64).sin().mul_add(1_000.0, secs);
    }
    acc
}

fn log_stats(stats: &CacheStatistics) {
    info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate,
        evictions = stats.evictions,
        promotions = stats.promotions,
        demotions = stats.demotions,
        expirations = stats.expirations,
        hot = stats.hot_entries,
        warm = stats.warm_entries,
        cold = stats.cold_entries,
        "Cache statistics"
    );
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
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
    fn test_bucket_key() {
        assert_eq!(bucket_key(0, 60), "t:0");
        assert_eq!(bucket_key(59, 60), "t:0");
        assert_eq!(bucket_key(61, 60), "t:60");
    }

    #[test]
    fn test_compute_value_is_pure() {
        assert_eq!(compute_value("t:120"), compute_value("t:120"));
    }

    #[test]
    fn test_workload_hits_repeated_buckets() {
        let cache = TieredCache::with_config(CacheConfig::default()).unwrap();
        let workload = Workload {
            operations: 2_000,
            time_span_secs: 600,
            bucket_secs: 60,
            seed: 7,
        };

        let summary = workload.run(&cache, &CancellationToken::new());
        assert_eq!(summary.lookups, 2_000);

        // Only ten buckets exist, so all but the first touch of each hits
        let stats = cache.stats();
        assert!(stats.misses <= 10);
        assert_eq!(stats.lookups(), 2_000);
    }

    #[test]
    fn test_workload_reproducible_from_seed() {
        let workload = Workload {
            operations: 500,
            time_span_secs: 3_600,
            bucket_secs: 60,
            seed: 11,
        };
        let run = || {
            let cache = TieredCache::with_config(CacheConfig::default()).unwrap();
            workload.run(&cache, &CancellationToken::new());
            cache.stats()
        };

        let first = run();
        let second = run();
        assert_eq!(first.hits, second.hits);
        assert_eq!(first.misses, second.misses);
        assert_eq!(first.evictions, second.evictions);
        assert_eq!(first.total_entries, second.total_entries);
    }

    #[test]
    fn test_sampled_timestamps_within_span() {
        let workload = Workload {
            operations: 0,
            time_span_secs: 90,
            bucket_secs: 60,
            seed: 3,
        };
        let mut rng = StdRng::seed_from_u64(workload.seed);
        assert!((0..1_000).all(|_| workload.sample_timestamp(&mut rng) < 90));
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from(["tiercache", "--hot-capacity", "7", "--default-ttl", "5m"]);
        let config = args.cache_config().unwrap();
        assert_eq!(config.capacities.hot, 7);
        assert_eq!(config.default_ttl, Duration::from_secs(300));
    }
}
