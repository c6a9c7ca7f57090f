// Run configuration: stages, thresholds, parsers, validation

mod run_config;

pub use run_config::{parse_duration, parse_stage, RunConfig, Stage};
