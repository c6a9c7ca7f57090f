//! Worker pool: spawns, retires and force-cancels virtual users.
//!
//! Each worker runs the scenario loop until its stop flag is set. Retirement
//! is cooperative: the flag is observed at the top of an iteration, so an
//! in-flight iteration always completes unless the shutdown grace deadline
//! forces an abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

use crate::metrics::collector::{MetricsCollector, ITERATIONS};
use crate::scenario::{IterationContext, Scenario};

struct WorkerHandle {
    vu: u64,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct WorkerPool {
    scenario: Arc<dyn Scenario>,
    collector: MetricsCollector,
    iteration_pause: Duration,
    active: Vec<WorkerHandle>,
    retiring: Vec<WorkerHandle>,
    next_vu: u64,
}

impl WorkerPool {
    pub fn new(
        scenario: Arc<dyn Scenario>,
        collector: MetricsCollector,
        iteration_pause: Duration,
    ) -> Self {
        Self {
            scenario,
            collector,
            iteration_pause,
            active: Vec::new(),
            retiring: Vec::new(),
            next_vu: 0,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Grow or shrink the pool to `desired` workers. Shrinking retires the
    /// most recently spawned workers first; they finish their current
    /// iteration before exiting.
    pub fn resize(&mut self, desired: usize) {
        self.retiring.retain(|w| !w.handle.is_finished());

        while self.active.len() > desired {
            let worker = self.active.pop().expect("len checked above");
            worker.stop.store(true, Ordering::Relaxed);
            tracing::debug!("retiring VU {}", worker.vu);
            self.retiring.push(worker);
        }

        while self.active.len() < desired {
            self.spawn_worker();
        }
    }

    fn spawn_worker(&mut self) {
        self.next_vu += 1;
        let vu = self.next_vu;
        let stop = Arc::new(AtomicBool::new(false));

        let scenario = Arc::clone(&self.scenario);
        let collector = self.collector.clone();
        let pause = self.iteration_pause;
        let stop_flag = Arc::clone(&stop);

        tracing::debug!("spawning VU {}", vu);
        let handle = tokio::spawn(async move {
            worker_loop(vu, scenario, collector, pause, stop_flag).await;
        });

        self.active.push(WorkerHandle { vu, stop, handle });
    }

    /// Stop every worker. In-flight iterations get up to `grace` to finish;
    /// whatever is still running after the deadline is aborted.
    pub async fn shutdown(mut self, grace: Duration) {
        for worker in self.active.iter().chain(self.retiring.iter()) {
            worker.stop.store(true, Ordering::Relaxed);
        }

        let mut workers: Vec<WorkerHandle> = self.active.drain(..).collect();
        workers.append(&mut self.retiring);

        let deadline = Instant::now() + grace;
        for mut worker in workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if timeout(remaining, &mut worker.handle).await.is_err() {
                tracing::warn!("VU {} exceeded ramp-down grace, aborting", worker.vu);
                worker.handle.abort();
                let _ = worker.handle.await;
            }
        }
    }
}

async fn worker_loop(
    vu: u64,
    scenario: Arc<dyn Scenario>,
    collector: MetricsCollector,
    pause: Duration,
    stop: Arc<AtomicBool>,
) {
    let mut iteration = 0u64;
    while !stop.load(Ordering::Relaxed) {
        let ctx = IterationContext {
            vu,
            iteration,
            collector: collector.clone(),
        };
        scenario.execute(ctx).await;
        collector.add_counter(ITERATIONS, 1.0);
        iteration += 1;

        // Pacing between iterations
        tokio::time::sleep(pause).await;
    }
    tracing::debug!("VU {} stopped after {} iterations", vu, iteration);
}
