//! Ramping VUs executor - drive the worker pool along the configured stages

use std::sync::Arc;

use anyhow::Result;
use tokio::time::{interval, Instant};

use super::pool::WorkerPool;
use super::ramp::RampProfile;
use super::RunSummary;
use crate::config::RunConfig;
use crate::metrics::collector::{MetricsCollector, VUS};
use crate::metrics::reporter;
use crate::metrics::thresholds;
use crate::scenario::transactions::TransactionScenario;
use crate::scenario::Scenario;

/// Run the ramping-VUs scenario against the configured transaction API.
pub async fn run(config: RunConfig) -> Result<RunSummary> {
    config.validate()?;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let scenario: Arc<dyn Scenario> =
        Arc::new(TransactionScenario::new(client, config.base_url.clone()));

    run_with_scenario(config, scenario).await
}

/// Executor core, generic over the scenario so tests can drive it directly.
pub async fn run_with_scenario(
    config: RunConfig,
    scenario: Arc<dyn Scenario>,
) -> Result<RunSummary> {
    config.validate()?;

    // Setup metrics collector and periodic reporter
    let collector = MetricsCollector::new();
    let reporter_handle = {
        let collector = collector.clone();
        let interval_secs = config.report_interval.as_secs();
        tokio::spawn(async move {
            reporter::start_periodic_reporter(collector, interval_secs).await;
        })
    };

    let profile = RampProfile::new(config.stages.clone());
    let total_duration = profile.total_duration();
    let mut pool = WorkerPool::new(scenario, collector.clone(), config.iteration_pause);

    tracing::info!(
        "Starting ramping-vus run: {} stages over {:?}",
        config.stages.len(),
        total_duration
    );

    // Run clock: one resize per tick
    let start_time = Instant::now();
    let mut ticker = interval(config.tick_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let elapsed = start_time.elapsed();
                if elapsed >= total_duration {
                    break;
                }
                let target = profile.target_at(elapsed);
                pool.resize(target as usize);
                collector.add_gauge(VUS, pool.active_count() as f64);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted, entering graceful ramp-down");
                break;
            }
        }
    }

    tracing::info!(
        "Run clock finished, winding down (grace {:?})",
        config.graceful_ramp_down
    );
    reporter_handle.abort();
    pool.shutdown(config.graceful_ramp_down).await;
    collector.add_gauge(VUS, 0.0);

    finish(&collector, &config)
}

/// Evaluate thresholds and emit the final report.
pub(super) fn finish(collector: &MetricsCollector, config: &RunConfig) -> Result<RunSummary> {
    let results = thresholds::evaluate(collector, &config.thresholds);
    let passed = thresholds::all_passed(&results);
    let report = reporter::render_final_report(collector, &results);
    print!("{}", report);

    if passed {
        tracing::info!("All thresholds passed");
    } else {
        for result in results.iter().filter(|r| !r.passed) {
            tracing::error!(
                "Threshold failed: {}: {} (actual: {:?})",
                result.metric,
                result.expression,
                result.actual
            );
        }
    }

    Ok(RunSummary {
        passed,
        thresholds: results,
        report,
    })
}
