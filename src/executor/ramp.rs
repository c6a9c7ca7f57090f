//! Ramp curve: target VU count as a function of elapsed time.

use std::time::Duration;

use crate::config::Stage;

/// The ramp curve described by an ordered stage sequence. Each stage
/// interpolates linearly from the previous stage's target (0 before the first
/// stage) to its own target over its duration. Past the end of the last stage
/// the last target is held; the executor's wind-down owns everything after
/// that point.
#[derive(Debug, Clone)]
pub struct RampProfile {
    start_vus: u64,
    stages: Vec<Stage>,
}

impl RampProfile {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            start_vus: 0,
            stages,
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Target concurrency at `elapsed`, rounded to the nearest whole VU.
    pub fn target_at(&self, elapsed: Duration) -> u64 {
        let mut prev = self.start_vus;
        let mut offset = Duration::ZERO;

        for stage in &self.stages {
            let end = offset + stage.duration;
            if elapsed < end {
                let progress =
                    (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64();
                let from = prev as f64;
                let to = stage.target as f64;
                return (from + (to - from) * progress).round() as u64;
            }
            prev = stage.target;
            offset = end;
        }

        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(secs: u64, target: u64) -> Stage {
        Stage {
            duration: Duration::from_secs(secs),
            target,
        }
    }

    #[test]
    fn starts_at_zero() {
        let profile = RampProfile::new(vec![stage(120, 100)]);
        assert_eq!(profile.target_at(Duration::ZERO), 0);
    }

    #[test]
    fn interpolates_within_a_stage() {
        let profile = RampProfile::new(vec![stage(120, 100)]);
        assert_eq!(profile.target_at(Duration::from_secs(60)), 50);
        assert_eq!(profile.target_at(Duration::from_secs(30)), 25);
    }

    #[test]
    fn holds_flat_stages() {
        // 2m ramp to 100, 5m hold, 2m ramp down
        let profile = RampProfile::new(vec![stage(120, 100), stage(300, 100), stage(120, 0)]);
        assert_eq!(profile.target_at(Duration::from_secs(120)), 100);
        assert_eq!(profile.target_at(Duration::from_secs(300)), 100);
        assert_eq!(profile.target_at(Duration::from_secs(420)), 100);
    }

    #[test]
    fn ramps_down_to_zero() {
        let profile = RampProfile::new(vec![stage(120, 100), stage(300, 100), stage(120, 0)]);
        assert_eq!(profile.target_at(Duration::from_secs(480)), 50);
        assert_eq!(profile.target_at(Duration::from_secs(540)), 0);
    }

    #[test]
    fn holds_last_target_past_the_end() {
        let up_only = RampProfile::new(vec![stage(60, 40)]);
        assert_eq!(up_only.target_at(Duration::from_secs(90)), 40);
        assert_eq!(up_only.target_at(Duration::from_secs(3600)), 40);
    }

    #[test]
    fn stays_within_bracketing_targets() {
        let profile = RampProfile::new(vec![stage(90, 60), stage(45, 10), stage(30, 25)]);

        let boundaries = [(0u64, 90u64, 0u64, 60u64), (90, 135, 10, 60), (135, 165, 10, 25)];
        for (start, end, lo, hi) in boundaries {
            for elapsed in start..end {
                let target = profile.target_at(Duration::from_secs(elapsed));
                assert!(
                    (lo..=hi).contains(&target),
                    "target {} at {}s outside [{}, {}]",
                    target,
                    elapsed,
                    lo,
                    hi
                );
            }
        }
    }

    #[test]
    fn monotone_within_a_single_ramp() {
        let profile = RampProfile::new(vec![stage(100, 50)]);
        let mut prev = 0;
        for elapsed in 0..=100 {
            let target = profile.target_at(Duration::from_secs(elapsed));
            assert!(target >= prev, "ramp decreased at {}s", elapsed);
            prev = target;
        }
        assert_eq!(prev, 50);
    }
}
