use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{parse_duration, parse_stage, RunConfig, Stage};
use crate::metrics::thresholds::{parse_threshold_spec, ThresholdSpec};

/// Transaction API Load Testing Tool
#[derive(Parser, Debug)]
#[command(name = "txn-load")]
#[command(about = "Load testing harness for the transaction management API")]
#[command(version)]
pub struct Cli {
    /// Base URL of the API under test, without the port
    #[arg(long, default_value = "http://localhost", env = "TARGET_BASE_URL")]
    pub base_url: String,

    /// Port of the API under test
    #[arg(long, default_value = "80", env = "PORT")]
    pub port: u16,

    /// Per-request timeout
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub request_timeout: Duration,

    /// Pause between scenario iterations
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub iteration_pause: Duration,

    /// Metrics reporting interval in seconds
    #[arg(long, default_value = "5")]
    pub report_interval: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub executor: Executor,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Executor {
    /// Ramp the VU count through a sequence of stages
    RampingVus(RampingVusArgs),

    /// Hold a fixed VU count for a duration
    ConstantVus(ConstantVusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RampingVusArgs {
    /// Ramp stage as <duration>:<target VUs>; repeat for multiple stages
    #[arg(
        long = "stage",
        value_parser = parse_stage,
        default_values = ["2m:100", "5m:100", "2m:0"]
    )]
    pub stages: Vec<Stage>,

    /// Grace period for in-flight iterations after the run ends
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub graceful_ramp_down: Duration,

    /// Threshold as <metric>:<expression>; repeat for multiple thresholds
    #[arg(
        long = "threshold",
        value_parser = parse_threshold_spec,
        default_values = ["http_req_duration:p(95)<2000", "http_req_failed:rate<0.01"]
    )]
    pub thresholds: Vec<ThresholdSpec>,
}

#[derive(Args, Debug, Clone)]
pub struct ConstantVusArgs {
    /// Number of virtual users to hold
    #[arg(long)]
    pub vus: u64,

    /// Test duration
    #[arg(long, default_value = "60s", value_parser = parse_duration)]
    pub duration: Duration,

    /// Grace period for in-flight iterations after the run ends
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub graceful_ramp_down: Duration,

    /// Threshold as <metric>:<expression>; repeat for multiple thresholds
    #[arg(
        long = "threshold",
        value_parser = parse_threshold_spec,
        default_values = ["http_req_duration:p(95)<2000", "http_req_failed:rate<0.01"]
    )]
    pub thresholds: Vec<ThresholdSpec>,
}

impl Cli {
    /// Effective target base URL with the port applied.
    pub fn target_base_url(&self) -> String {
        format!("{}:{}", self.base_url.trim_end_matches('/'), self.port)
    }

    /// Assemble the immutable run configuration for the selected executor.
    pub fn run_config(&self) -> RunConfig {
        let (stages, graceful_ramp_down, thresholds) = match &self.executor {
            Executor::RampingVus(args) => (
                args.stages.clone(),
                args.graceful_ramp_down,
                args.thresholds.clone(),
            ),
            Executor::ConstantVus(args) => (
                vec![Stage {
                    duration: args.duration,
                    target: args.vus,
                }],
                args.graceful_ramp_down,
                args.thresholds.clone(),
            ),
        };

        RunConfig {
            base_url: self.target_base_url(),
            stages,
            graceful_ramp_down,
            thresholds,
            request_timeout: self.request_timeout,
            iteration_pause: self.iteration_pause,
            tick_interval: Duration::from_secs(1),
            report_interval: Duration::from_secs(self.report_interval.max(1)),
        }
    }
}
