//! Threshold evaluation of extracted metrics.

use serde::{Deserialize, Serialize};

use super::extract::MetricSet;
use crate::verdict::{Finding, Severity};

/// Which side of the threshold is passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// A fixed numeric goal for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub metric_key: String,
    pub threshold: f64,
    pub direction: Direction,
    /// Display unit, e.g. `ms` or `%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Target {
    pub fn new(metric_key: &str, threshold: f64, direction: Direction) -> Self {
        Self {
            metric_key: metric_key.to_string(),
            threshold,
            direction,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn meets(&self, value: f64) -> bool {
        match self.direction {
            Direction::HigherIsBetter => value >= self.threshold,
            Direction::LowerIsBetter => value <= self.threshold,
        }
    }

    /// Met, but by less than `margin` (a fraction of the threshold). Only
    /// higher-is-better targets have a near-miss band.
    pub fn is_near_miss(&self, value: f64, margin: f64) -> bool {
        self.direction == Direction::HigherIsBetter
            && self.meets(value)
            && value < self.threshold * (1.0 + margin)
    }

    fn show(&self, value: f64) -> String {
        match &self.unit {
            Some(unit) if unit == "%" => format!("{}%", trim(value)),
            Some(unit) => format!("{} {}", trim(value), unit),
            None => trim(value),
        }
    }
}

fn trim(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// How a validator grades target misses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityPolicy {
    /// Severity of a missed target.
    pub miss: Severity,
    /// Severity of a near miss, `None` to stay silent.
    pub near_miss: Option<Severity>,
    pub margin: f64,
}

impl SeverityPolicy {
    /// Misses block, near misses warn.
    pub fn strict(margin: f64) -> Self {
        Self {
            miss: Severity::Block,
            near_miss: Some(Severity::Warn),
            margin,
        }
    }

    /// Misses warn, near misses are not reported.
    pub fn advisory() -> Self {
        Self {
            miss: Severity::Warn,
            near_miss: None,
            margin: 0.0,
        }
    }
}

/// Compare metrics against targets, in target order.
///
/// Metrics without a target and targets without a metric produce nothing.
pub fn evaluate(
    category: &str,
    metrics: &MetricSet,
    targets: &[Target],
    policy: &SeverityPolicy,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for target in targets {
        let Some(value) = metrics.get(&target.metric_key) else {
            continue;
        };
        let rule = format!("{}.{}", category, target.metric_key);

        if !target.meets(value) {
            let relation = match target.direction {
                Direction::LowerIsBetter => "exceeds",
                Direction::HigherIsBetter => "below",
            };
            let hint = match target.direction {
                Direction::LowerIsBetter => "Optimization needed",
                Direction::HigherIsBetter => "Performance improvement needed",
            };
            findings.push(
                Finding::new(
                    policy.miss,
                    rule,
                    format!(
                        "{}: {} {} target {}",
                        target.metric_key,
                        target.show(value),
                        relation,
                        target.show(target.threshold)
                    ),
                )
                .with_hint(hint),
            );
        } else if let Some(severity) = policy.near_miss {
            if target.is_near_miss(value, policy.margin) {
                findings.push(Finding::new(
                    severity,
                    rule,
                    format!(
                        "{}: {} close to target {}",
                        target.metric_key,
                        target.show(value),
                        target.show(target.threshold)
                    ),
                ));
            }
        }
    }

    findings
}
