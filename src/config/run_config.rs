//! Static run configuration, built once from the CLI and read-only afterwards.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::metrics::thresholds::ThresholdSpec;

/// One segment of the ramp curve: interpolate the VU count from the previous
/// stage's target to `target` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

/// Immutable configuration shared by the executor, worker pool and collector.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base URL of the API under test, port already applied.
    pub base_url: String,

    /// Ordered ramp stages.
    pub stages: Vec<Stage>,

    /// How long retired workers may finish their in-flight iteration before
    /// being aborted.
    pub graceful_ramp_down: Duration,

    /// Pass/fail assertions evaluated at run end.
    pub thresholds: Vec<ThresholdSpec>,

    /// Per-request timeout on the shared HTTP client.
    pub request_timeout: Duration,

    /// Pause between scenario iterations (the scripted `sleep(1)`).
    pub iteration_pause: Duration,

    /// Scheduler polling interval.
    pub tick_interval: Duration,

    /// Live report refresh interval.
    pub report_interval: Duration,
}

impl RunConfig {
    /// Reject configurations the scheduler cannot run. Called before the run
    /// clock starts; any error here is fatal.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.stages.is_empty() {
            return Err(ConfigError::EmptyStages);
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(ConfigError::ZeroDurationStage { index });
            }
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        Ok(())
    }

    /// Total scripted duration of all stages, excluding the ramp-down grace.
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }
}

/// Parse a duration with a unit suffix: `500ms`, `30s`, `2m`, `1h`.
/// A bare number is taken as seconds.
pub fn parse_duration(input: &str) -> ConfigResult<Duration> {
    let input = input.trim();
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if input.is_empty() {
        return Err(invalid("empty string"));
    }

    let (value_str, multiplier_ms) = if let Some(v) = input.strip_suffix("ms") {
        (v, 1u64)
    } else if let Some(v) = input.strip_suffix('s') {
        (v, 1_000)
    } else if let Some(v) = input.strip_suffix('m') {
        (v, 60_000)
    } else if let Some(v) = input.strip_suffix('h') {
        (v, 3_600_000)
    } else {
        (input, 1_000)
    };

    let value: u64 = value_str
        .parse()
        .map_err(|_| invalid("expected an unsigned number with an optional ms/s/m/h suffix"))?;

    Ok(Duration::from_millis(value * multiplier_ms))
}

/// Parse a ramp stage written as `<duration>:<target>`, e.g. `2m:100`.
pub fn parse_stage(input: &str) -> ConfigResult<Stage> {
    let invalid = || ConfigError::InvalidStage {
        input: input.to_string(),
    };

    let (duration_str, target_str) = input.split_once(':').ok_or_else(invalid)?;
    let duration = parse_duration(duration_str)?;
    let target: u64 = target_str.trim().parse().map_err(|_| invalid())?;

    Ok(Stage { duration, target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::thresholds::parse_threshold_spec;

    fn config_with_stages(stages: Vec<Stage>) -> RunConfig {
        RunConfig {
            base_url: "http://localhost:80".to_string(),
            stages,
            graceful_ramp_down: Duration::from_secs(30),
            thresholds: vec![],
            request_timeout: Duration::from_secs(30),
            iteration_pause: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
            report_interval: Duration::from_secs(5),
        }
    }

    #[test]
    fn parses_suffixed_durations() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn rejects_bad_durations() {
        assert!(matches!(
            parse_duration(""),
            Err(ConfigError::InvalidDuration { .. })
        ));
        assert!(matches!(
            parse_duration("-5s"),
            Err(ConfigError::InvalidDuration { .. })
        ));
        assert!(matches!(
            parse_duration("2x"),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn parses_stages() {
        let stage = parse_stage("2m:100").unwrap();
        assert_eq!(stage.duration, Duration::from_secs(120));
        assert_eq!(stage.target, 100);

        assert!(matches!(
            parse_stage("2m"),
            Err(ConfigError::InvalidStage { .. })
        ));
        assert!(matches!(
            parse_stage("2m:lots"),
            Err(ConfigError::InvalidStage { .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_stages() {
        let config = config_with_stages(vec![]);
        assert_eq!(config.validate(), Err(ConfigError::EmptyStages));
    }

    #[test]
    fn validate_rejects_zero_duration_stage() {
        let config = config_with_stages(vec![
            Stage {
                duration: Duration::from_secs(10),
                target: 5,
            },
            Stage {
                duration: Duration::ZERO,
                target: 0,
            },
        ]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDurationStage { index: 1 })
        );
    }

    #[test]
    fn validate_rejects_zero_request_timeout() {
        let mut config = config_with_stages(vec![Stage {
            duration: Duration::from_secs(10),
            target: 1,
        }]);
        config.request_timeout = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroRequestTimeout));
    }

    #[test]
    fn total_duration_sums_stages() {
        let config = config_with_stages(vec![
            parse_stage("2m:100").unwrap(),
            parse_stage("5m:100").unwrap(),
            parse_stage("2m:0").unwrap(),
        ]);
        assert_eq!(config.total_duration(), Duration::from_secs(9 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_thresholds_parse() {
        let spec = parse_threshold_spec("http_req_duration:p(95)<2000").unwrap();
        assert_eq!(spec.metric, "http_req_duration");
    }
}
