// Scenario module
// The per-iteration script each virtual user runs in a loop

pub mod transactions;

use std::future::Future;
use std::pin::Pin;

use crate::metrics::collector::MetricsCollector;

/// Per-iteration context handed to the scenario by the worker loop.
#[derive(Clone)]
pub struct IterationContext {
    pub vu: u64,
    pub iteration: u64,
    pub collector: MetricsCollector,
}

/// One scenario iteration. Implementations report every outcome through the
/// context's collector; a failed call or check is recorded, never returned,
/// so a single iteration can never abort its worker or the run.
pub trait Scenario: Send + Sync {
    fn execute(
        &self,
        ctx: IterationContext,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
