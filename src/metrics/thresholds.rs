//! Threshold expressions: parsing and end-of-run evaluation.
//!
//! The grammar is the one the run configuration uses:
//! `<aggregate> <op> <bound>` where the aggregate is one of `p(N)`, `rate`,
//! `avg`, `min`, `max`, `count`, `value`, and the operator is `<`, `<=`, `>`
//! or `>=`. A spec line ties a metric name to one or more expressions,
//! e.g. `http_req_duration:p(95)<2000`.

use crate::error::{ConfigError, ConfigResult};
use crate::metrics::collector::MetricsCollector;
use crate::metrics::types::MetricKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    /// Percentile over a trend, argument in percent (`p(95)` -> 95.0).
    Percentile(f64),
    Rate,
    Avg,
    Min,
    Max,
    Count,
    /// Latest value of a gauge.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn holds(self, actual: f64, bound: f64) -> bool {
        match self {
            Op::Lt => actual < bound,
            Op::Le => actual <= bound,
            Op::Gt => actual > bound,
            Op::Ge => actual >= bound,
        }
    }
}

/// One parsed assertion, e.g. `p(95)<2000`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpr {
    pub agg: Aggregate,
    pub op: Op,
    pub bound: f64,
    /// Original text, kept for reporting.
    pub raw: String,
}

/// All assertions configured for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSpec {
    pub metric: String,
    pub exprs: Vec<ThresholdExpr>,
}

/// Outcome of one assertion, computed once at run end.
#[derive(Debug, Clone)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    /// Aggregate value the assertion was checked against; `None` when the
    /// metric recorded no samples.
    pub actual: Option<f64>,
    pub passed: bool,
}

/// Parse a spec line of the form `<metric>:<expr>[,<expr>...]`.
pub fn parse_threshold_spec(input: &str) -> ConfigResult<ThresholdSpec> {
    let invalid = |reason: &str| ConfigError::InvalidThreshold {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (metric, exprs_str) = input
        .split_once(':')
        .ok_or_else(|| invalid("expected <metric>:<expression>"))?;
    let metric = metric.trim();
    if metric.is_empty() {
        return Err(invalid("empty metric name"));
    }

    let exprs = exprs_str
        .split(',')
        .map(|e| parse_expr(e.trim(), input))
        .collect::<ConfigResult<Vec<_>>>()?;
    if exprs.is_empty() {
        return Err(invalid("no expressions"));
    }

    Ok(ThresholdSpec {
        metric: metric.to_string(),
        exprs,
    })
}

fn parse_expr(expr: &str, full_input: &str) -> ConfigResult<ThresholdExpr> {
    let invalid = |reason: String| ConfigError::InvalidThreshold {
        input: full_input.to_string(),
        reason,
    };

    // Two-character operators must be tried first.
    let (op, op_idx, op_len) = if let Some(idx) = expr.find("<=") {
        (Op::Le, idx, 2)
    } else if let Some(idx) = expr.find(">=") {
        (Op::Ge, idx, 2)
    } else if let Some(idx) = expr.find('<') {
        (Op::Lt, idx, 1)
    } else if let Some(idx) = expr.find('>') {
        (Op::Gt, idx, 1)
    } else {
        return Err(invalid(format!(
            "no comparison operator in '{}'",
            expr
        )));
    };

    let agg_str = expr[..op_idx].trim();
    let bound_str = expr[op_idx + op_len..].trim();

    let agg = parse_aggregate(agg_str)
        .ok_or_else(|| invalid(format!("unknown aggregate '{}'", agg_str)))?;
    let bound: f64 = bound_str
        .parse()
        .map_err(|_| invalid(format!("invalid bound '{}'", bound_str)))?;

    Ok(ThresholdExpr {
        agg,
        op,
        bound,
        raw: expr.to_string(),
    })
}

fn parse_aggregate(input: &str) -> Option<Aggregate> {
    match input {
        "rate" => Some(Aggregate::Rate),
        "avg" => Some(Aggregate::Avg),
        "min" => Some(Aggregate::Min),
        "max" => Some(Aggregate::Max),
        "count" => Some(Aggregate::Count),
        "value" => Some(Aggregate::Value),
        _ => {
            let pct = input.strip_prefix("p(")?.strip_suffix(')')?;
            let pct: f64 = pct.trim().parse().ok()?;
            if (0.0..=100.0).contains(&pct) {
                Some(Aggregate::Percentile(pct))
            } else {
                None
            }
        }
    }
}

/// Evaluate every configured assertion against the collector's aggregates.
/// Deterministic for a fixed set of recorded outcomes. An assertion over a
/// metric with no samples passes.
pub fn evaluate(collector: &MetricsCollector, specs: &[ThresholdSpec]) -> Vec<ThresholdResult> {
    let mut results = Vec::new();
    for spec in specs {
        for expr in &spec.exprs {
            let actual = aggregate_value(collector, &spec.metric, expr.agg);
            let passed = match actual {
                Some(actual) => expr.op.holds(actual, expr.bound),
                None => true,
            };
            results.push(ThresholdResult {
                metric: spec.metric.clone(),
                expression: expr.raw.clone(),
                actual,
                passed,
            });
        }
    }
    results
}

pub fn all_passed(results: &[ThresholdResult]) -> bool {
    results.iter().all(|r| r.passed)
}

fn aggregate_value(collector: &MetricsCollector, metric: &str, agg: Aggregate) -> Option<f64> {
    match agg {
        Aggregate::Percentile(pct) => collector.trend_value_at_quantile(metric, pct / 100.0),
        Aggregate::Avg => collector.trend_stats(metric).map(|s| s.mean),
        Aggregate::Min => collector.trend_stats(metric).map(|s| s.min as f64),
        Aggregate::Max => collector.trend_stats(metric).map(|s| s.max as f64),
        Aggregate::Rate => collector.rate_stats(metric).map(|s| s.rate()),
        Aggregate::Value => collector.gauge_last(metric),
        Aggregate::Count => match collector.kind_of(metric)? {
            MetricKind::Counter => collector.counter_sum(metric),
            _ => {
                let count = collector.sample_count(metric);
                if count == 0 {
                    None
                } else {
                    Some(count as f64)
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::collector::{HTTP_REQ_DURATION, HTTP_REQ_FAILED, ITERATIONS};

    #[test]
    fn parses_percentile_expression() {
        let spec = parse_threshold_spec("http_req_duration:p(95)<2000").unwrap();
        assert_eq!(spec.metric, "http_req_duration");
        assert_eq!(spec.exprs.len(), 1);
        assert_eq!(spec.exprs[0].agg, Aggregate::Percentile(95.0));
        assert_eq!(spec.exprs[0].op, Op::Lt);
        assert_eq!(spec.exprs[0].bound, 2000.0);
    }

    #[test]
    fn parses_multiple_expressions_per_metric() {
        let spec = parse_threshold_spec("http_req_duration:p(95)<2000,avg<=500").unwrap();
        assert_eq!(spec.exprs.len(), 2);
        assert_eq!(spec.exprs[1].agg, Aggregate::Avg);
        assert_eq!(spec.exprs[1].op, Op::Le);
    }

    #[test]
    fn rejects_malformed_specs() {
        for input in [
            "no-colon",
            ":p(95)<2000",
            "m:p(95)",
            "m:nope<1",
            "m:p(200)<1",
            "m:rate<fast",
        ] {
            assert!(
                matches!(
                    parse_threshold_spec(input),
                    Err(ConfigError::InvalidThreshold { .. })
                ),
                "expected parse failure for '{}'",
                input
            );
        }
    }

    #[test]
    fn evaluates_percentile_and_rate() {
        let collector = MetricsCollector::new();
        for ms in 1..=100 {
            collector.add_trend(HTTP_REQ_DURATION, ms as f64);
        }
        for i in 0..200 {
            collector.add_rate(HTTP_REQ_FAILED, i == 0);
        }

        let specs = vec![
            parse_threshold_spec("http_req_duration:p(95)<2000").unwrap(),
            parse_threshold_spec("http_req_failed:rate<0.01").unwrap(),
        ];
        let results = evaluate(&collector, &specs);
        assert_eq!(results.len(), 2);
        assert!(results[0].passed);
        assert_eq!(results[0].actual, Some(95.0));
        // 1 pass out of 200 observations: rate 0.005
        assert!(results[1].passed);

        let strict = vec![parse_threshold_spec("http_req_duration:p(95)<50").unwrap()];
        assert!(!evaluate(&collector, &strict)[0].passed);
    }

    #[test]
    fn empty_metric_passes() {
        let collector = MetricsCollector::new();
        let specs = vec![parse_threshold_spec("http_req_duration:p(95)<2000").unwrap()];
        let results = evaluate(&collector, &specs);
        assert!(results[0].passed);
        assert_eq!(results[0].actual, None);
        assert!(all_passed(&results));
    }

    #[test]
    fn count_reads_counter_sum() {
        let collector = MetricsCollector::new();
        collector.add_counter(ITERATIONS, 1.0);
        collector.add_counter(ITERATIONS, 1.0);
        collector.add_counter(ITERATIONS, 1.0);

        let specs = vec![parse_threshold_spec("iterations:count>=3").unwrap()];
        let results = evaluate(&collector, &specs);
        assert!(results[0].passed);
        assert_eq!(results[0].actual, Some(3.0));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let collector = MetricsCollector::new();
        for ms in [12.0, 80.0, 300.0, 45.0, 7.0] {
            collector.add_trend(HTTP_REQ_DURATION, ms);
        }
        let specs = vec![parse_threshold_spec("http_req_duration:p(95)<2000,avg<100").unwrap()];

        let first = evaluate(&collector, &specs);
        let second = evaluate(&collector, &specs);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.actual, b.actual);
            assert_eq!(a.passed, b.passed);
        }
    }
}
