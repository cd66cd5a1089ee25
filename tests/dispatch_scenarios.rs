//! End-to-end gate scenarios through `dispatch::handle`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use qgate::dispatch::handle;
use qgate::event::Phase;
use qgate::runner::{CommandRunner, CommandSpec, RunOutcome};
use qgate::verdict::{Outcome, Severity, Verdict};

/// Replays canned outcomes in order.
#[derive(Default)]
struct FakeRunner {
    outcomes: Mutex<Vec<RunOutcome>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    fn with(outcomes: Vec<RunOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn stdout(text: &str) -> RunOutcome {
        RunOutcome::Finished {
            success: true,
            code: Some(0),
            stdout: text.to_string(),
            stderr: String::new(),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> RunOutcome {
        self.calls.lock().unwrap().push(spec.clone());
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            return RunOutcome::Unavailable {
                reason: "not scripted".to_string(),
            };
        }
        outcomes.remove(0)
    }
}

fn bash_event(command: &str) -> String {
    json!({ "tool_name": "Bash", "tool_input": { "command": command } }).to_string()
}

async fn gate(raw: &str, phase: Phase, root: &Path, runner: Arc<FakeRunner>) -> Verdict {
    handle(raw, phase, Some(root.to_path_buf()), runner).await
}

#[tokio::test]
async fn unmatched_tool_is_silent_allow() {
    let dir = TempDir::new().unwrap();
    let runner = FakeRunner::with(vec![]);
    let raw = json!({ "tool_name": "Read", "tool_input": { "filePath": "src/lib.rs" } }).to_string();

    for phase in [Phase::Pre, Phase::Post] {
        let verdict = gate(&raw, phase, dir.path(), runner.clone()).await;
        assert_eq!(verdict.outcome, Outcome::Allow);
        assert!(verdict.findings.is_empty());
        assert_eq!(verdict.render(), "");
    }
    assert!(runner.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unwrap_in_edited_source_blocks() {
    let dir = TempDir::new().unwrap();
    let raw = json!({
        "tool_name": "Edit",
        "tool_input": {
            "file_path": "src/planner.rs",
            "new_string": "fn plan() {\n    let steps = compute().unwrap();\n}\n"
        }
    })
    .to_string();

    let verdict = gate(&raw, Phase::Pre, dir.path(), FakeRunner::with(vec![])).await;

    assert_eq!(verdict.exit_code(), 2);
    assert!(verdict
        .findings
        .iter()
        .any(|f| f.rule == "quality.unwrap" && f.severity == Severity::Block));
    assert!(verdict.render().contains("✗ qgate: blocked"));
}

#[tokio::test]
async fn cfg_test_item_does_not_exempt_rest_of_file() {
    let dir = TempDir::new().unwrap();
    let raw = json!({
        "tool_name": "Write",
        "tool_input": {
            "filePath": "src/run.rs",
            "content": "#[cfg(test)]\nuse std::fmt;\n\nfn run() {\n    let v = load().unwrap();\n    panic!(\"boom\");\n}\n\npub struct Undocumented;\n"
        }
    })
    .to_string();

    let pre = gate(&raw, Phase::Pre, dir.path(), FakeRunner::with(vec![])).await;
    assert_eq!(pre.exit_code(), 2);
    let blocked: Vec<&str> = pre
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Block)
        .map(|f| f.rule.as_str())
        .collect();
    assert_eq!(blocked, vec!["quality.unwrap", "quality.panic"]);

    let post = gate(&raw, Phase::Post, dir.path(), FakeRunner::with(vec![])).await;
    assert_eq!(post.exit_code(), 2);
    assert_eq!(post.findings[0].rule, "documentation.public_api");
    assert!(post.findings[0].message.contains("'Undocumented'"));
}

#[tokio::test]
async fn unwrap_in_test_path_is_allowed() {
    let dir = TempDir::new().unwrap();
    let raw = json!({
        "tool_name": "Write",
        "tool_input": {
            "filePath": "tests/planner_test.rs",
            "content": "#[test]\nfn t() { compute().unwrap(); }\n"
        }
    })
    .to_string();

    let verdict = gate(&raw, Phase::Pre, dir.path(), FakeRunner::with(vec![])).await;
    assert_eq!(verdict.outcome, Outcome::Allow);
}

#[tokio::test]
async fn slow_planning_benchmark_blocks() {
    let dir = TempDir::new().unwrap();
    let runner = FakeRunner::with(vec![FakeRunner::stdout(
        "planning: 150 ms\ncache hit rate: 80%\nthroughput: 25,000 req/hour\n",
    )]);

    let verdict = gate(&bash_event("cargo bench"), Phase::Pre, dir.path(), runner.clone()).await;

    assert_eq!(verdict.outcome, Outcome::Block);
    let blocked: Vec<&str> = verdict
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Block)
        .map(|f| f.rule.as_str())
        .collect();
    assert_eq!(blocked, vec!["benchmark.planning_time"]);

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].cwd, dir.path());
}

#[tokio::test]
async fn coverage_total_met_module_below_warns() {
    let dir = TempDir::new().unwrap();
    let runner = FakeRunner::with(vec![FakeRunner::stdout(
        "coverage: 85%\nplanner 70%\ncache 91%\n",
    )]);

    let verdict = gate(&bash_event("cargo test"), Phase::Post, dir.path(), runner).await;

    assert_eq!(verdict.outcome, Outcome::Warn);
    assert!(verdict.findings.iter().all(|f| f.severity != Severity::Block));
    let warns: Vec<&str> = verdict
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Warn)
        .map(|f| f.message.as_str())
        .collect();
    assert_eq!(warns, vec!["Module planner: 70.0% below target 82%"]);
}

#[tokio::test]
async fn empty_tests_dir_blocks() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("tests")).unwrap();
    let runner = FakeRunner::with(vec![]);

    let verdict = gate(&bash_event("cargo test"), Phase::Pre, dir.path(), runner.clone()).await;

    assert_eq!(verdict.exit_code(), 2);
    assert!(verdict.findings[0]
        .message
        .contains("No integration tests found"));
    assert!(runner.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_input_is_neutral() {
    let dir = TempDir::new().unwrap();
    for raw in ["{not json", "[]", r#"{"tool_name":"Bash","tool_input":"ls"}"#] {
        let verdict = gate(raw, Phase::Pre, dir.path(), FakeRunner::with(vec![])).await;
        assert_eq!(verdict.exit_code(), 0);
        assert!(verdict.findings.is_empty());
    }
}

#[tokio::test]
async fn project_config_from_event_cwd() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".qgate")).unwrap();
    std::fs::write(
        dir.path().join(".qgate").join("config.toml"),
        "[coverage]\ntarget = 90.0\n",
    )
    .unwrap();

    let raw = json!({
        "tool_name": "Bash",
        "tool_input": { "command": "cargo test" },
        "cwd": dir.path().to_str().unwrap()
    })
    .to_string();
    let runner = FakeRunner::with(vec![FakeRunner::stdout("coverage: 85%\n")]);

    let verdict = handle(&raw, Phase::Post, None, runner).await;

    assert_eq!(verdict.outcome, Outcome::Warn);
    assert!(verdict
        .findings
        .iter()
        .any(|f| f.rule == "coverage.total_coverage" && f.message.contains("target 90")));
}
