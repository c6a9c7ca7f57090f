//! Constant VUs executor - hold a fixed worker count for the whole run

use std::sync::Arc;

use anyhow::Result;
use tokio::time::{interval, Instant};

use super::pool::WorkerPool;
use super::ramping_vus::finish;
use super::RunSummary;
use crate::config::RunConfig;
use crate::metrics::collector::{MetricsCollector, VUS};
use crate::metrics::reporter;
use crate::scenario::transactions::TransactionScenario;
use crate::scenario::Scenario;

/// Run at a fixed VU count: the highest stage target, held for the total
/// stage duration. No ramping; the pool is filled on the first tick.
pub async fn run(config: RunConfig) -> Result<RunSummary> {
    config.validate()?;

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let scenario: Arc<dyn Scenario> =
        Arc::new(TransactionScenario::new(client, config.base_url.clone()));

    run_with_scenario(config, scenario).await
}

pub async fn run_with_scenario(
    config: RunConfig,
    scenario: Arc<dyn Scenario>,
) -> Result<RunSummary> {
    config.validate()?;

    let vus = config
        .stages
        .iter()
        .map(|s| s.target)
        .max()
        .unwrap_or_default();
    let duration = config.total_duration();

    let collector = MetricsCollector::new();
    let reporter_handle = {
        let collector = collector.clone();
        let interval_secs = config.report_interval.as_secs();
        tokio::spawn(async move {
            reporter::start_periodic_reporter(collector, interval_secs).await;
        })
    };

    let mut pool = WorkerPool::new(scenario, collector.clone(), config.iteration_pause);

    tracing::info!("Starting constant-vus run: {} VUs for {:?}", vus, duration);

    let start_time = Instant::now();
    let mut ticker = interval(config.tick_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if start_time.elapsed() >= duration {
                    break;
                }
                pool.resize(vus as usize);
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
