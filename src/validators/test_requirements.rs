//! Test suite requirements for test commands.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::Validator;
use crate::config::Config;
use crate::event::{Phase, ToolInvocation};
use crate::runner::{tail, CommandRunner, CommandSpec, RunOutcome};
use crate::verdict::{Finding, Severity};

const TRIGGER: &str = "cargo test";

/// Checks test layout and dependencies, then runs the suite.
pub struct TestRequirementsValidator {
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
}

impl TestRequirementsValidator {
    pub fn new(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    fn static_checks(&self, invocation: &ToolInvocation) -> Vec<Finding> {
        let cfg = &self.config.tests;
        let root = &invocation.project_root;
        let tests_dir = root.join(&cfg.tests_dir);
        let mut findings = Vec::new();

        if !contains_rust_file(&tests_dir) {
            findings.push(
                Finding::block(
                    "tests.integration",
                    format!("No integration tests found in {}/ directory", cfg.tests_dir),
                )
                .with_hint(format!("Required: integration tests in {}/", cfg.tests_dir)),
            );
        }

        if !tests_dir.join(&cfg.fixtures_dir).is_dir() {
            findings.push(Finding::warn(
                "tests.fixtures",
                format!(
                    "Consider adding test fixtures in {}/{}/",
                    cfg.tests_dir, cfg.fixtures_dir
                ),
            ));
        }

        let manifest = std::fs::read_to_string(root.join(&cfg.manifest)).unwrap_or_default();
        if !manifest.contains(&cfg.property_crate) {
            findings.push(Finding::warn(
                "tests.property",
                format!(
                    "Consider adding {} for property-based testing",
                    cfg.property_crate
                ),
            ));
        }

        let wants_coverage = cfg
            .coverage_flags
            .iter()
            .any(|flag| invocation.command_contains(flag));
        if !wants_coverage {
            findings.push(
                Finding::warn(
                    "tests.coverage_flag",
                    "Consider running with coverage: cargo test --cov",
                )
                .with_hint(format!(
                    "Target: {}% coverage",
                    self.config.coverage.target
                )),
            );
        }

        findings
    }

    async fn run_suite(&self, invocation: &ToolInvocation) -> Option<Finding> {
        let cfg = &self.config.tests;
        let spec = CommandSpec::from_argv(&cfg.command, &invocation.project_root, cfg.timeout())?;

        let finding = match self.runner.run(&spec).await {
            RunOutcome::Finished { success: true, .. } => {
                Finding::info("tests.run", format!("{} passed", spec.display()))
            }
            RunOutcome::Finished {
                code,
                stdout,
                stderr,
                ..
            } => {
                let output = if stderr.trim().is_empty() { stdout } else { stderr };
                let code = code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into());
                Finding::block("tests.run", format!("Tests failed (exit {})", code))
                    .with_hint(tail(&output, cfg.max_output_lines))
            }
            RunOutcome::TimedOut { after } => Finding::block(
                "tests.run",
                format!("Test timeout after {} seconds", after.as_secs()),
            ),
            RunOutcome::Unavailable { reason } => {
                Finding::info("tests.run", format!("Test run skipped: {}", reason))
            }
        };
        Some(finding)
    }
}

/// True when `dir` holds at least one `.rs` file at any depth.
fn contains_rust_file(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        if path.is_dir() {
            contains_rust_file(&path)
        } else {
            path.extension().map(|e| e == "rs").unwrap_or(false)
        }
    })
}

#[async_trait]
impl Validator for TestRequirementsValidator {
    fn name(&self) -> &'static str {
        "tests"
    }

    fn phase(&self) -> Phase {
        Phase::Pre
    }

    fn applies(&self, invocation: &ToolInvocation) -> bool {
        invocation.is_shell() && invocation.command_contains(TRIGGER)
    }

    async fn evaluate(&self, invocation: &ToolInvocation) -> Vec<Finding> {
        let mut findings = self.static_checks(invocation);

        if findings.iter().any(|f| f.severity >= Severity::Warn) {
            debug!(
                findings = findings.len(),
                "Static test checks not clean, not running the suite"
            );
            return findings;
        }

        findings.extend(self.run_suite(invocation).await);
        findings
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::runner::testing::ScriptedRunner;

    fn project(with_test: bool, with_fixtures: bool, manifest: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("tests")).unwrap();
        if with_test {
            std::fs::write(dir.path().join("tests").join("flow.rs"), "#[test]\nfn t() {}\n").unwrap();
        }
        if with_fixtures {
            std::fs::create_dir_all(dir.path().join("tests").join("fixtures")).unwrap();
        }
        std::fs::write(dir.path().join("Cargo.toml"), manifest).unwrap();
        dir
    }

    fn bash(command: &str, root: &Path) -> ToolInvocation {
        ToolInvocation {
            tool_name: "Bash".to_string(),
            command: command.to_string(),
            project_root: root.to_path_buf(),
            ..Default::default()
        }
    }

    fn validator(runner: Arc<ScriptedRunner>) -> TestRequirementsValidator {
        TestRequirementsValidator::new(Arc::new(Config::default()), runner)
    }

    #[tokio::test]
    async fn test_empty_tests_dir_blocks_without_running() {
        let dir = project(false, true, "[dev-dependencies]\nproptest = \"1\"\n");
        let runner = Arc::new(ScriptedRunner::default());

        let findings = validator(runner.clone())
            .evaluate(&bash("cargo test --cov", dir.path()))
            .await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Block);
        assert!(findings[0].message.contains("No integration tests found"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_warnings_skip_the_run() {
        let dir = project(true, false, "[dependencies]\n");
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::finished(
            true, "ok", "",
        )]));

        let findings = validator(runner.clone())
            .evaluate(&bash("cargo test", dir.path()))
            .await;

        let rules: Vec<&str> = findings.iter().map(|f| f.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec!["tests.fixtures", "tests.property", "tests.coverage_flag"]
        );
        assert!(findings.iter().all(|f| f.severity == Severity::Warn));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_coverage_flag_warning_alone_skips_the_run() {
        let dir = project(true, true, "[dev-dependencies]\nproptest = \"1\"\n");
        let runner = Arc::new(ScriptedRunner::default());

        let findings = validator(runner.clone())
            .evaluate(&bash("cargo test", dir.path()))
            .await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "tests.coverage_flag");
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_clean_project_runs_the_suite() {
        let dir = project(true, true, "[dev-dependencies]\nproptest = \"1\"\n");
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::finished(
            true, "ok", "",
        )]));

        let findings = validator(runner.clone())
            .evaluate(&bash("cargo test --cov", dir.path()))
            .await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, "tests.run");
        assert_eq!(findings[0].severity, Severity::Info);

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].display(), "cargo test -- --nocapture");
        assert_eq!(calls[0].cwd, dir.path());
        assert_eq!(calls[0].timeout, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_failing_suite_blocks_with_output() {
        let dir = project(true, true, "proptest = \"1\"\n");
        let runner = Arc::new(ScriptedRunner::new(vec![ScriptedRunner::finished(
            false,
            "",
            "thread 'x' panicked\nassertion failed",
        )]));

        let findings = validator(runner)
            .evaluate(&bash("cargo test --coverage", dir.path()))
            .await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Block);
        assert!(findings[0].hint.as_deref().unwrap().contains("assertion failed"));
    }

    #[tokio::test]
    async fn test_timeout_blocks_and_missing_tool_informs() {
        let dir = project(true, true, "proptest = \"1\"\n");
        let runner = Arc::new(ScriptedRunner::new(vec![
            RunOutcome::TimedOut {
                after: Duration::from_secs(120),
            },
            RunOutcome::Unavailable {
                reason: "cargo not found".to_string(),
            },
        ]));
        let v = validator(runner);

        let findings = v.evaluate(&bash("cargo test --cov", dir.path())).await;
        assert_eq!(findings[0].severity, Severity::Block);
        assert!(findings[0].message.contains("120 seconds"));

        let findings = v.evaluate(&bash("cargo test --cov", dir.path())).await;
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_applies_only_to_test_commands() {
        let v = validator(Arc::new(ScriptedRunner::default()));
        assert!(v.applies(&bash("cargo test -p core", Path::new("."))));
        assert!(!v.applies(&bash("cargo build", Path::new("."))));

        let edit = ToolInvocation {
            tool_name: "Edit".to_string(),
            command: "cargo test".to_string(),
            ..Default::default()
        };
        assert!(!v.applies(&edit));
    }
}
