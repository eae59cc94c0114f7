//! Prometheus Exposition
//!
//! A [`Collector`] that reads a live cache's statistics at scrape time, so
//! the cache itself carries no Prometheus types on its hot path.

use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, IntCounter, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::cache::{CacheStatistics, Tier, TieredCache};
use crate::error::{Error, Result};

/// One scrape's worth of metrics, built fresh for every `collect()`
struct ScrapeMetrics {
    hits: IntCounter,
    misses: IntCounter,
    evictions: IntCounter,
    promotions: IntCounter,
    demotions: IntCounter,
    expirations: IntCounter,
    hit_rate: Gauge,
    entries: IntGaugeVec,
}

impl ScrapeMetrics {
    fn new(namespace: &str) -> prometheus::Result<Self> {
        let counter = |name: &str, help: &str| {
            IntCounter::with_opts(Opts::new(name, help).namespace(namespace))
        };

        Ok(Self {
            hits: counter("hits_total", "Cache lookups served from any tier")?,
            misses: counter("misses_total", "Cache lookups that found no fresh entry")?,
            evictions: counter("evictions_total", "Capacity-driven removals from any tier")?,
            promotions: counter("promotions_total", "Entries moved to a hotter tier")?,
            demotions: counter("demotions_total", "Evicted entries moved to a colder tier")?,
            expirations: counter("expirations_total", "Expired entries removed by maintenance")?,
            hit_rate: Gauge::with_opts(
                Opts::new("hit_rate", "Hits divided by lookups since the last clear")
                    .namespace(namespace),
            )?,
            entries: IntGaugeVec::new(
                Opts::new("entries", "Entries currently stored per tier").namespace(namespace),
                &["tier"],
            )?,
        })
    }

    fn descs(&self) -> Vec<Desc> {
        let mut descs = Vec::new();
        descs.extend(self.hits.desc().into_iter().cloned());
        descs.extend(self.misses.desc().into_iter().cloned());
        descs.extend(self.evictions.desc().into_iter().cloned());
        descs.extend(self.promotions.desc().into_iter().cloned());
        descs.extend(self.demotions.desc().into_iter().cloned());
        descs.extend(self.expirations.desc().into_iter().cloned());
        descs.extend(self.hit_rate.desc().into_iter().cloned());
        descs.extend(self.entries.desc().into_iter().cloned());
        descs
    }

    fn observe(&self, stats: &CacheStatistics) {
        self.hits.inc_by(stats.hits);
        self.misses.inc_by(stats.misses);
        self.evictions.inc_by(stats.evictions);
        self.promotions.inc_by(stats.promotions);
        self.demotions.inc_by(stats.demotions);
        self.expirations.inc_by(stats.expirations);
        self.hit_rate.set(stats.hit_rate);
        for tier in Tier::ALL {
            self.entries
                .with_label_values(&[tier.as_str()])
                .set(stats.entries_in(tier) as i64);
        }
    }

    fn families(&self) -> Vec<MetricFamily> {
        let mut families = Vec::new();
        families.extend(self.hits.collect());
        families.extend(self.misses.collect());
        families.extend(self.evictions.collect());
        families.extend(self.promotions.collect());
        families.extend(self.demotions.collect());
        families.extend(self.expirations.collect());
        families.extend(self.hit_rate.collect());
        families.extend(self.entries.collect());
        families
    }
}

/// Exports [`TieredCache`] statistics as Prometheus metrics
///
/// Counters are rebuilt from a statistics snapshot on every scrape, so
/// they follow `clear` and concurrent scrapes never share state.
pub struct CacheCollector<V> {
    cache: Arc<TieredCache<V>>,
    namespace: String,
    descs: Vec<Desc>,
}

impl<V: Send + 'static> CacheCollector<V> {
    /// Create a collector whose metric names are prefixed with `namespace`
    pub fn new(cache: Arc<TieredCache<V>>, namespace: &str) -> Result<Self> {
        let descs = ScrapeMetrics::new(namespace)?.descs();
        Ok(Self {
            cache,
            namespace: namespace.to_string(),
            descs,
        })
    }

    /// Register this collector with `registry`
    pub fn register(self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self))?;
        Ok(())
    }
}

impl<V: Send + 'static> Collector for CacheCollector<V> {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let metrics = match ScrapeMetrics::new(&self.namespace) {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("Failed to build cache metrics: {}", e);
                return Vec::new();
            }
        };

        metrics.observe(&self.cache.stats());
        metrics.families()
    }
}

/// Render every metric in `registry` in the Prometheus text format
pub fn render(registry: &Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| Error::Metrics(prometheus::Error::Msg(format!("non-UTF-8 exposition: {}", e))))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierCapacities;
    use std::time::Duration;

    fn cache() -> Arc<TieredCache<u32>> {
        Arc::new(TieredCache::new(TierCapacities::new(2, 2, 2), Duration::from_secs(60)).unwrap())
    }

    #[test]
    fn test_collector_exports_statistics() {
        let cache = cache();
        let registry = Registry::new();
        CacheCollector::new(cache.clone(), "tiercache")
            .unwrap()
            .register(&registry)
            .unwrap();

        cache.set("a", 1, None);
        cache.get("a");
        cache.get("b");

        let text = render(&registry).unwrap();
        assert!(text.contains("tiercache_hits_total 1"));
        assert!(text.contains("tiercache_misses_total 1"));
        assert!(text.contains("tiercache_hit_rate 0.5"));
        assert!(text.contains("tiercache_entries{tier=\"hot\"} 1"));
        assert!(text.contains("tiercache_entries{tier=\"cold\"} 0"));
    }

    #[test]
    fn test_counters_follow_clear() {
        let cache = cache();
        let registry = Registry::new();
        CacheCollector::new(cache.clone(), "tc")
            .unwrap()
            .register(&registry)
            .unwrap();

        cache.get("missing");
        assert!(render(&registry).unwrap().contains("tc_misses_total 1"));

        cache.clear();
        assert!(render(&registry).unwrap().contains("tc_misses_total 0"));
    }

    #[test]
    fn test_concurrent_scrapes_report_same_values() {
        let cache = cache();
        let registry = Registry::new();
        CacheCollector::new(cache.clone(), "par")
            .unwrap()
            .register(&registry)
            .unwrap();

        for _ in 0..5 {
            cache.get("missing");
        }

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let text = render(&registry).unwrap();
                        assert!(text.contains("par_misses_total 5"), "{}", text);
                        assert!(text.contains("par_hits_total 0"), "{}", text);
                    }
                });
            }
        });
    }

    #[test]
    fn test_collect_leaves_no_state_behind() {
        let cache = cache();
        let collector = CacheCollector::new(cache.clone(), "st").unwrap();

        cache.get("missing");
        let first = collector.collect();
        let second = collector.collect();

        let text = |families: Vec<MetricFamily>| {
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&families, &mut buffer).unwrap();
            String::from_utf8(buffer).unwrap()
        };
        assert!(text(first).contains("st_misses_total 1"));
        assert!(text(second).contains("st_misses_total 1"));
        assert_eq!(collector.desc().len(), 8);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let cache = cache();
        let registry = Registry::new();
        CacheCollector::new(cache.clone(), "dup")
            .unwrap()
            .register(&registry)
            .unwrap();

        let second = CacheCollector::new(cache, "dup").unwrap().register(&registry);
        assert!(matches!(second, Err(Error::Metrics(_))));
    }
}
