//! Console reporter for metrics with real-time updates

use std::fmt::Write as _;
use std::io::{self, Write};

use tokio::time::{interval, Duration};

use super::collector::{
    MetricsCollector, CHECKS, HTTP_REQ_DURATION, HTTP_REQ_FAILED, ITERATIONS, VUS,
};
use super::thresholds::ThresholdResult;
use super::types::MetricKind;

/// Start periodic metrics reporting (every N seconds)
pub async fn start_periodic_reporter(collector: MetricsCollector, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        ticker.tick().await;

        // Update system metrics before printing
        collector.update_system_metrics();

        print_live_metrics(&collector);
    }
}

/// Print live metrics (clears screen and updates in place)
pub fn print_live_metrics(collector: &MetricsCollector) {
    // Clear screen and move cursor to top
    print!("\x1B[2J\x1B[1;1H");

    let elapsed = collector.elapsed_seconds();
    let system = collector.system_stats();

    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║             Transaction API Load Test - Live Metrics           ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    println!(
        "\n⏱  Elapsed Time: {:02}:{:02}:{:02}",
        elapsed / 3600,
        (elapsed % 3600) / 60,
        elapsed % 60
    );

    let vus = collector.gauge_last(VUS).unwrap_or(0.0);
    let iterations = collector.counter_sum(ITERATIONS).unwrap_or(0.0);
    let throughput = if elapsed > 0 {
        iterations / elapsed as f64
    } else {
        0.0
    };

    println!("\n┌─ LOAD ──────────────────────────────────────────────────────┐");
    println!(
        "│  Active VUs:   {:>8}    Iterations: {:>8}              │",
        vus as u64, iterations as u64
    );
    println!(
        "│  Iteration Rate: {:>7.2}/sec                                │",
        throughput
    );
    println!("└─────────────────────────────────────────────────────────────┘");

    if let Some(latency) = collector.trend_stats(HTTP_REQ_DURATION) {
        println!("\n┌─ HTTP REQUEST LATENCY (ms) ─────────────────────────────────┐");
        println!(
            "│  Min: {:>6}  P50: {:>6}  P95: {:>6}  P99: {:>6}  Max: {:>6}│",
            latency.min, latency.p50, latency.p95, latency.p99, latency.max
        );
        println!(
            "│  Mean: {:>8.2} ms    Count: {:>10}                    │",
            latency.mean, latency.count
        );
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    let failed = collector.rate_stats(HTTP_REQ_FAILED);
    let checks = collector.rate_stats(CHECKS);
    if failed.is_some() || checks.is_some() {
        println!("\n┌─ OUTCOMES ──────────────────────────────────────────────────┐");
        if let Some(failed) = failed {
            println!(
                "│  Failed Requests: {:>6.2}%   ({} of {})                  │",
                failed.rate() * 100.0,
                failed.passes,
                failed.count()
            );
        }
        if let Some(checks) = checks {
            println!(
                "│  Checks Passing:  {:>6.2}%   ({} of {})                  │",
                checks.rate() * 100.0,
                checks.passes,
                checks.count()
            );
        }
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    println!("\n┌─ SYSTEM ────────────────────────────────────────────────────┐");
    println!(
        "│  CPU Usage:    {:>6.1}%    Memory: {:>6} / {:>6} MB       │",
        system.cpu_usage, system.memory_used_mb, system.memory_total_mb
    );
    println!("└─────────────────────────────────────────────────────────────┘");

    println!("\n  [Press Ctrl+C to stop test]");

    // Flush stdout to ensure immediate display
    let _ = io::stdout().flush();
}

/// Render the final summary. Returned as a string so the binary can print it
/// and tests can assert on it.
pub fn render_final_report(
    collector: &MetricsCollector,
    thresholds: &[ThresholdResult],
) -> String {
    let elapsed = collector.elapsed();
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "╔════════════════════════════════════════════════════════════════╗");
    let _ = writeln!(out, "║                    FINAL TEST REPORT                           ║");
    let _ = writeln!(out, "╚════════════════════════════════════════════════════════════════╝");

    let checks = collector.checks();
    if !checks.is_empty() {
        let _ = writeln!(out, "\nCHECKS");
        for check in &checks {
            let mark = if check.fails == 0 { '✓' } else { '✗' };
            let _ = writeln!(
                out,
                "   {} {:<45} {:>6} passed, {:>6} failed",
                mark, check.name, check.passes, check.fails
            );
        }
    }

    let _ = writeln!(out, "\nMETRICS");
    for name in collector.metric_names() {
        match collector.kind_of(&name) {
            Some(MetricKind::Trend) => {
                if let Some(s) = collector.trend_stats(&name) {
                    let _ = writeln!(
                        out,
                        "   {:<22} min={} p50={} p95={} p99={} max={} mean={:.2} count={}",
                        name, s.min, s.p50, s.p95, s.p99, s.max, s.mean, s.count
                    );
                }
            }
            Some(MetricKind::Rate) => {
                if let Some(s) = collector.rate_stats(&name) {
                    let _ = writeln!(
                        out,
                        "   {:<22} rate={:.2}% ({} of {})",
                        name,
                        s.rate() * 100.0,
                        s.passes,
                        s.count()
                    );
                }
            }
            Some(MetricKind::Counter) => {
                let sum = collector.counter_sum(&name).unwrap_or(0.0);
                let per_sec = if elapsed.as_secs_f64() > 0.0 {
                    sum / elapsed.as_secs_f64()
                } else {
                    0.0
                };
                let _ = writeln!(out, "   {:<22} count={} rate={:.2}/sec", name, sum as u64, per_sec);
            }
            Some(MetricKind::Gauge) => {
                let last = collector.gauge_last(&name).unwrap_or(0.0);
                let _ = writeln!(out, "   {:<22} value={}", name, last as u64);
            }
            None => {}
        }
    }

    if !thresholds.is_empty() {
        let _ = writeln!(out, "\nTHRESHOLDS");
        for result in thresholds {
            let mark = if result.passed { "PASS" } else { "FAIL" };
            let actual = match result.actual {
                Some(v) => format!("{:.2}", v),
                None => "no samples".to_string(),
            };
            let _ = writeln!(
                out,
                "   [{}] {}: {} (actual: {})",
                mark, result.metric, result.expression, actual
            );
        }
    }

    let _ = writeln!(out, "\n⏱  Test Duration: {:.2} seconds", elapsed.as_secs_f64());
    let _ = writeln!(out, "════════════════════════════════════════════════════════════════");

    out
}

/// Print final summary report
pub fn print_final_report(collector: &MetricsCollector, thresholds: &[ThresholdResult]) {
    print!("{}", render_final_report(collector, thresholds));
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::thresholds::{evaluate, parse_threshold_spec};

    #[test]
    fn final_report_names_recorded_metrics_and_thresholds() {
        let collector = MetricsCollector::new();
        collector.add_trend(HTTP_REQ_DURATION, 42.0);
        collector.add_rate(HTTP_REQ_FAILED, false);
        collector.add_check("create transaction status is 201", true);
        collector.add_counter(ITERATIONS, 1.0);

        let specs = vec![parse_threshold_spec("http_req_duration:p(95)<2000").unwrap()];
        let results = evaluate(&collector, &specs);
        let report = render_final_report(&collector, &results);

        for name in [HTTP_REQ_DURATION, HTTP_REQ_FAILED, CHECKS, ITERATIONS] {
            assert!(report.contains(name), "report should mention {}", name);
        }
        assert!(report.contains("create transaction status is 201"));
        assert!(report.contains("[PASS]"));
    }
}
