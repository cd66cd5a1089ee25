//! Coverage analysis after test runs.
//!
//! Coverage shortfalls are advisory: they warn but never block, and a missing or
//! failing coverage tool only skips the analysis.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::Validator;
use crate::config::Config;
use crate::event::{Phase, ToolInvocation};
use crate::metrics::{coverage_extractor, evaluate, ExtractorChain, SeverityPolicy};
use crate::runner::{tail, CommandRunner, CommandSpec, RunOutcome};
use crate::verdict::Finding;

/// Runs the coverage tool (with a plain test run as fallback) and checks the target.
pub struct CoverageValidator {
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    extractor: ExtractorChain,
}

impl CoverageValidator {
    pub fn new(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            extractor: coverage_extractor(),
        }
    }

    /// Coverage report text, or the reason analysis was skipped.
    async fn measure(&self, invocation: &ToolInvocation) -> Result<String, String> {
        let cfg = &self.config.coverage;
        let root = &invocation.project_root;

        let primary = CommandSpec::from_argv(&cfg.command, root, cfg.timeout())
            .ok_or_else(|| "no coverage command configured".to_string())?;

        match self.runner.run(&primary).await {
            RunOutcome::Finished {
                success: true,
                stdout,
                ..
            } => return Ok(stdout),
            RunOutcome::Finished { .. } => {
                debug!(command = %primary.display(), "Coverage tool failed, trying fallback");
            }
            RunOutcome::TimedOut { after } => {
                return Err(format!("coverage analysis timeout after {}s", after.as_secs()))
            }
            RunOutcome::Unavailable { reason } => return Err(reason),
        }

        let fallback = CommandSpec::from_argv(&cfg.fallback_command, root, cfg.fallback_timeout())
            .ok_or_else(|| format!("{} failed", primary.display()))?;

        match self.runner.run(&fallback).await {
            RunOutcome::Finished {
                success: true,
                stdout,
                ..
            } => Ok(stdout),
            RunOutcome::Finished { stderr, .. } => Err(format!(
                "{} failed: {}",
                fallback.display(),
                tail(&stderr, 3)
            )),
            RunOutcome::TimedOut { after } => Err(format!(
                "coverage analysis timeout after {}s",
                after.as_secs()
            )),
            RunOutcome::Unavailable { reason } => Err(reason),
        }
    }

    fn judge(&self, output: &str) -> Vec<Finding> {
        let cfg = &self.config.coverage;
        let metrics = self.extractor.extract(output);

        let Some(total) = metrics.get("total_coverage") else {
            return vec![Finding::info(
                "coverage.total",
                "No coverage total found in output",
            )];
        };

        let mut findings = vec![Finding::info(
            "coverage.total",
            format!("Total: {:.1}% (Target: {}%)", total, cfg.target),
        )];

        let target = cfg.total_target();
        let shortfall = evaluate(
            "coverage",
            &metrics,
            std::slice::from_ref(&target),
            &SeverityPolicy::advisory(),
        );
        let below = !shortfall.is_empty();
        findings.extend(shortfall.into_iter().map(|f| {
            f.with_hint(
                "Add unit tests for uncovered code\nAdd integration tests for module interactions",
            )
        }));

        let mut low_modules = 0;
        for (name, pct) in metrics.submetrics.iter().filter(|(_, pct)| **pct < cfg.target) {
            low_modules += 1;
            findings.push(Finding::warn(
                "coverage.module",
                format!("Module {}: {:.1}% below target {}%", name, pct, cfg.target),
            ));
        }

        if !below && low_modules == 0 {
            findings.push(Finding::info("coverage.total", "Coverage target met"));
        }
        findings
    }
}

#[async_trait]
impl Validator for CoverageValidator {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn phase(&self) -> Phase {
        Phase::Post
    }

    fn applies(&self, invocation: &ToolInvocation) -> bool {
        invocation.is_shell()
            && (invocation.command_contains("cargo test")
                || invocation.command.to_lowercase().contains("coverage"))
    }

    async fn evaluate(&self, invocation: &ToolInvocation) -> Vec<Finding> {
        match self.measure(invocation).await {
            Ok(output) => self.judge(&output),
            Err(reason) => vec![Finding::info(
                "coverage.skipped",
                format!("Coverage analysis skipped: {}", reason),
            )],
        }
    }
}
