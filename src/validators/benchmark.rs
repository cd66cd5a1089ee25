//! Benchmark performance targets.

use std::sync::Arc;

use async_trait::async_trait;

use super::Validator;
use crate::config::Config;
use crate::event::{Phase, ToolInvocation};
use crate::metrics::{benchmark_extractor, evaluate, ExtractorChain, SeverityPolicy};
use crate::runner::{tail, CommandRunner, CommandSpec, RunOutcome};
use crate::verdict::{Finding, Severity};

const TRIGGER: &str = "cargo bench";

/// Runs the benchmark suite and compares results with the configured targets.
pub struct BenchmarkValidator {
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    extractor: ExtractorChain,
}

impl BenchmarkValidator {
    pub fn new(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            extractor: benchmark_extractor(),
        }
    }

    fn judge(&self, output: &str) -> Vec<Finding> {
        let cfg = &self.config.benchmark;
        let metrics = self.extractor.extract(output);
        if metrics.is_empty() {
            return vec![Finding::info(
                "benchmark.metrics",
                "No benchmark metrics found in output",
            )];
        }

        let mut findings = evaluate(
            "benchmark",
            &metrics,
            &cfg.targets,
            &SeverityPolicy::strict(cfg.near_margin),
        );
        if findings.iter().all(|f| f.severity == Severity::Info) {
            findings.push(Finding::info("benchmark.targets", "All benchmark targets met"));
        }
        findings
    }
}

#[async_trait]
impl Validator for BenchmarkValidator {
    fn name(&self) -> &'static str {
        "benchmark"
    }

    fn phase(&self) -> Phase {
        Phase::Pre
    }

    fn applies(&self, invocation: &ToolInvocation) -> bool {
        invocation.is_shell() && invocation.command_contains(TRIGGER)
    }

    async fn evaluate(&self, invocation: &ToolInvocation) -> Vec<Finding> {
        let cfg = &self.config.benchmark;
        let Some(spec) =
            CommandSpec::from_argv(&cfg.command, &invocation.project_root, cfg.timeout())
        else {
            return vec![Finding::info("benchmark.run", "No benchmark command configured")];
        };

        // A benchmark run that cannot complete fails the gate, missing tool included.
        match self.runner.run(&spec).await {
            RunOutcome::Finished {
                success: true,
                stdout,
                ..
            } => self.judge(&stdout),
            RunOutcome::Finished { stdout, stderr, .. } => {
                let output = if stderr.trim().is_empty() { stdout } else { stderr };
                vec![
                    Finding::block("benchmark.run", "Benchmark execution failed")
                        .with_hint(tail(&output, cfg.max_output_lines)),
                ]
            }
            RunOutcome::TimedOut { after } => vec![Finding::block(
                "benchmark.run",
                format!(
                    "Benchmark execution failed: timeout after {} seconds",
                    after.as_secs()
                ),
            )],
            RunOutcome::Unavailable { reason } => vec![Finding::block(
                "benchmark.run",
                format!("Benchmark execution failed: {}", reason),
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::runner::testing::ScriptedRunner;

    fn bash(command: &str) -> ToolInvocation {
        ToolInvocation {
            tool_name: "Bash".to_string(),
            command: command.to_string(),
            project_root: Path::new("/project").to_path_buf(),
            ..Default::default()
        }
    }

    async fn run_with(outcome: RunOutcome) -> (Vec<Finding>, Arc<ScriptedRunner>) {
        let runner = Arc::new(ScriptedRunner::new(vec![outcome]));
        let v = BenchmarkValidator::new(Arc::new(Config::default()), runner.clone());
        (v.evaluate(&bash("cargo bench")).await, runner)
    }

    #[tokio::test]
    async fn test_slow_planning_blocks() {
        let out = "planning: 150 ms\ncache hit rate: 75%\nthroughput: 20,000\n";
        let (findings, runner) = run_with(ScriptedRunner::finished(true, out, "")).await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Block);
        assert_eq!(findings[0].rule, "benchmark.planning_time");

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].timeout, Duration::from_secs(300));
        assert_eq!(calls[0].display(), "cargo bench -- --output-format json");
    }

    #[tokio::test]
    async fn test_near_target_warns() {
        let out = "planning: 20 ms\ncache hit rate: 62%\nthroughput: 10,500\n";
        let (findings, _) = run_with(ScriptedRunner::finished(true, out, "")).await;

        let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Warn, Severity::Warn]);
    }

    #[tokio::test]
    async fn test_all_met_is_informational() {
        let out = "planning: 20 ms\ncache hit rate: 90%\nthroughput: 50,000\n";
        let (findings, _) = run_with(ScriptedRunner::finished(true, out, "")).await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_failed_run_blocks() {
        let (findings, _) = run_with(ScriptedRunner::finished(false, "", "error[E0425]")).await;
        assert_eq!(findings[0].severity, Severity::Block);
        assert!(findings[0].hint.as_deref().unwrap().contains("E0425"));
    }

    #[tokio::test]
    async fn test_failed_run_hint_falls_back_to_stdout() {
        let stdout = (1..=60)
            .map(|i| format!("bench line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let (findings, _) = run_with(ScriptedRunner::finished(false, &stdout, "  \n")).await;

        let hint = findings[0].hint.as_deref().unwrap();
        assert_eq!(hint.lines().count(), 40);
        assert_eq!(hint.lines().next(), Some("bench line 21"));
        assert_eq!(hint.lines().last(), Some("bench line 60"));
    }

    #[tokio::test]
    async fn test_timeout_and_missing_tool_block() {
        let (findings, _) = run_with(RunOutcome::TimedOut {
            after: Duration::from_secs(300),
        })
        .await;
        assert_eq!(findings[0].severity, Severity::Block);
        assert!(findings[0].message.contains("300 seconds"));

        let (findings, _) = run_with(RunOutcome::Unavailable {
            reason: "cargo not found".to_string(),
        })
        .await;
        assert_eq!(findings[0].severity, Severity::Block);
    }

    #[tokio::test]
    async fn test_no_metrics_is_informational() {
        let (findings, _) = run_with(ScriptedRunner::finished(true, "done", "")).await;
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].rule, "benchmark.metrics");
    }

    #[test]
    fn test_applies() {
        let v = BenchmarkValidator::new(
            Arc::new(Config::default()),
            Arc::new(ScriptedRunner::default()),
        );
        assert!(v.applies(&bash("cargo bench --bench planning")));
        assert!(!v.applies(&bash("cargo test")));
    }
}
