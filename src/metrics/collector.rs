//! Metrics collector - thread-safe collection with latency tracking
//!
//! The collector owns an append-only sample log keyed by metric name. It is
//! cloned into every worker task; all writes go through [`MetricsCollector::record`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use super::types::{
    CheckStats, LatencyStats, MetricKind, OutcomeValue, RateStats, RequestOutcome, Sample,
    SystemStats,
};

/// Duration of each HTTP request, milliseconds.
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
/// Whether each HTTP request failed (transport error, timeout, or bad status).
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
/// Pass/fail of every named check.
pub const CHECKS: &str = "checks";
/// Completed scenario iterations.
pub const ITERATIONS: &str = "iterations";
/// Active virtual users, sampled by the scheduler each tick.
pub const VUS: &str = "vus";

struct Series {
    kind: MetricKind,
    samples: Vec<Sample>,
    // Trend aggregates
    hist: Option<Histogram<u64>>,
    // Counter aggregate
    sum: f64,
    // Rate aggregates
    passes: u64,
    fails: u64,
    // Gauge aggregate
    last: f64,
}

impl Series {
    fn new(kind: MetricKind) -> Self {
        let hist = match kind {
            // 3 significant digits of precision
            MetricKind::Trend => Some(Histogram::new(3).expect("failed to create histogram")),
            _ => None,
        };
        Self {
            kind,
            samples: Vec::new(),
            hist,
            sum: 0.0,
            passes: 0,
            fails: 0,
            last: 0.0,
        }
    }
}

struct Inner {
    series: RwLock<HashMap<String, Series>>,
    checks: RwLock<Vec<CheckStats>>,
    system: RwLock<System>,
    system_stats: RwLock<SystemStats>,
}

#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Inner>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        // Initialize system monitor
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            inner: Arc::new(Inner {
                series: RwLock::new(HashMap::new()),
                checks: RwLock::new(Vec::new()),
                system: RwLock::new(system),
                system_stats: RwLock::new(SystemStats::default()),
            }),
            start_time: Instant::now(),
        }
    }

    /// Append one outcome to the log. Exactly one sample is stored per call,
    /// regardless of how many workers record concurrently.
    pub fn record(&self, outcome: RequestOutcome) {
        let offset = outcome.recorded_at.saturating_duration_since(self.start_time);
        let mut series = self.inner.series.write();
        let entry = series
            .entry(outcome.metric)
            .or_insert_with(|| Series::new(outcome.value.kind()));

        entry.samples.push(Sample {
            value: outcome.value,
            offset,
        });

        match outcome.value {
            OutcomeValue::Trend(ms) => {
                if let Some(hist) = entry.hist.as_mut() {
                    let _ = hist.record(ms.max(0.0).round() as u64);
                }
            }
            OutcomeValue::Rate(ok) => {
                if ok {
                    entry.passes += 1;
                } else {
                    entry.fails += 1;
                }
            }
            OutcomeValue::Counter(n) => entry.sum += n,
            OutcomeValue::Gauge(v) => entry.last = v,
        }
    }

    pub fn add_trend(&self, metric: &str, ms: f64) {
        self.record(RequestOutcome::new(metric, OutcomeValue::Trend(ms)));
    }

    pub fn add_rate(&self, metric: &str, ok: bool) {
        self.record(RequestOutcome::new(metric, OutcomeValue::Rate(ok)));
    }

    pub fn add_counter(&self, metric: &str, n: f64) {
        self.record(RequestOutcome::new(metric, OutcomeValue::Counter(n)));
    }

    pub fn add_gauge(&self, metric: &str, value: f64) {
        self.record(RequestOutcome::new(metric, OutcomeValue::Gauge(value)));
    }

    /// Record the outcome of a named check. Feeds both the per-check tallies
    /// and the global `checks` rate.
    pub fn add_check(&self, name: &str, ok: bool) -> bool {
        {
            let mut checks = self.inner.checks.write();
            let entry = match checks.iter_mut().find(|c| c.name == name) {
                Some(entry) => entry,
                None => {
                    checks.push(CheckStats {
                        name: name.to_string(),
                        ..Default::default()
                    });
                    checks.last_mut().expect("just pushed")
                }
            };
            if ok {
                entry.passes += 1;
            } else {
                entry.fails += 1;
            }
        }
        self.add_rate(CHECKS, ok);
        ok
    }

    /// All metric names recorded so far, sorted for stable reporting.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.series.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn kind_of(&self, metric: &str) -> Option<MetricKind> {
        self.inner.series.read().get(metric).map(|s| s.kind)
    }

    pub fn sample_count(&self, metric: &str) -> usize {
        self.inner
            .series
            .read()
            .get(metric)
            .map_or(0, |s| s.samples.len())
    }

    pub fn trend_stats(&self, metric: &str) -> Option<LatencyStats> {
        let series = self.inner.series.read();
        let hist = series.get(metric)?.hist.as_ref()?;
        if hist.is_empty() {
            return None;
        }
        Some(LatencyStats {
            min: hist.min(),
            p50: hist.value_at_quantile(0.50),
            p95: hist.value_at_quantile(0.95),
            p99: hist.value_at_quantile(0.99),
            max: hist.max(),
            mean: hist.mean(),
            count: hist.len(),
        })
    }

    /// Latency value at an arbitrary quantile, `q` in `[0, 1]`.
    pub fn trend_value_at_quantile(&self, metric: &str, q: f64) -> Option<f64> {
        let series = self.inner.series.read();
        let hist = series.get(metric)?.hist.as_ref()?;
        if hist.is_empty() {
            return None;
        }
        Some(hist.value_at_quantile(q) as f64)
    }

    pub fn rate_stats(&self, metric: &str) -> Option<RateStats> {
        let series = self.inner.series.read();
        let entry = series.get(metric)?;
        if entry.kind != MetricKind::Rate {
            return None;
        }
        Some(RateStats {
            passes: entry.passes,
            fails: entry.fails,
        })
    }

    pub fn counter_sum(&self, metric: &str) -> Option<f64> {
        let series = self.inner.series.read();
        let entry = series.get(metric)?;
        if entry.kind != MetricKind::Counter {
            return None;
        }
        Some(entry.sum)
    }

    pub fn gauge_last(&self, metric: &str) -> Option<f64> {
        let series = self.inner.series.read();
        let entry = series.get(metric)?;
        if entry.kind != MetricKind::Gauge {
            return None;
        }
        Some(entry.last)
    }

    pub fn checks(&self) -> Vec<CheckStats> {
        self.inner.checks.read().clone()
    }

    /// Update system metrics (CPU, memory)
    pub fn update_system_metrics(&self) {
        let mut system = self.inner.system.write();
        system.refresh_cpu();
        system.refresh_memory();

        let mut stats = self.inner.system_stats.write();
        stats.cpu_usage = system.global_cpu_info().cpu_usage();
        stats.memory_used_mb = system.used_memory() / 1024 / 1024;
        stats.memory_total_mb = system.total_memory() / 1024 / 1024;
    }

    pub fn system_stats(&self) -> SystemStats {
        *self.inner.system_stats.read()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_aggregates_count_passes_and_fails() {
        let collector = MetricsCollector::new();
        collector.add_rate(HTTP_REQ_FAILED, false);
        collector.add_rate(HTTP_REQ_FAILED, false);
        collector.add_rate(HTTP_REQ_FAILED, true);

        let stats = collector.rate_stats(HTTP_REQ_FAILED).unwrap();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.fails, 2);
        assert!((stats.rate() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(collector.sample_count(HTTP_REQ_FAILED), 3);
    }

    #[test]
    fn trend_aggregates_expose_percentiles() {
        let collector = MetricsCollector::new();
        for ms in 1..=100 {
            collector.add_trend(HTTP_REQ_DURATION, ms as f64);
        }

        let stats = collector.trend_stats(HTTP_REQ_DURATION).unwrap();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 100);
        assert_eq!(stats.p95, 95);
    }

    #[test]
    fn checks_tally_per_name_and_feed_global_rate() {
        let collector = MetricsCollector::new();
        assert!(collector.add_check("status is 201", true));
        assert!(!collector.add_check("status is 201", false));
        collector.add_check("has id", true);

        let checks = collector.checks();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].name, "status is 201");
        assert_eq!(checks[0].passes, 1);
        assert_eq!(checks[0].fails, 1);

        let rate = collector.rate_stats(CHECKS).unwrap();
        assert_eq!(rate.count(), 3);
        assert_eq!(rate.passes, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_writers_lose_no_samples() {
        const WRITERS: usize = 16;
        const PER_WRITER: usize = 250;

        let collector = MetricsCollector::new();
        let mut handles = Vec::new();
        for _ in 0..WRITERS {
            let collector = collector.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..PER_WRITER {
                    collector.add_trend(HTTP_REQ_DURATION, i as f64);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            collector.sample_count(HTTP_REQ_DURATION),
            WRITERS * PER_WRITER
        );
        let stats = collector.trend_stats(HTTP_REQ_DURATION).unwrap();
        assert_eq!(stats.count as usize, WRITERS * PER_WRITER);
    }
}
