//! Code quality rules for edited source files.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::source::{fn_signatures, is_comment, production_lines, public_items, SourceLine};
use super::Validator;
use crate::config::Config;
use crate::event::{Phase, ToolInvocation};
use crate::verdict::Finding;

static UNWRAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bunwrap\(\)").expect("unwrap regex"));

static PANIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bpanic!").expect("panic regex"));

static ASYNC_FN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\basync\s+fn\b").expect("async fn regex"));

/// Files that only wire modules together.
const AGGREGATION_FILES: &[&str] = &["mod.rs", "lib.rs"];

/// Checks error handling, async runtime use, and public API docs.
pub struct QualityValidator {
    config: Arc<Config>,
}

impl QualityValidator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn is_source(&self, invocation: &ToolInvocation) -> bool {
        invocation
            .extension()
            .map(|ext| self.config.quality.source_extensions.contains(&ext))
            .unwrap_or(false)
    }

    fn check(&self, invocation: &ToolInvocation) -> Vec<Finding> {
        let mut findings = Vec::new();
        let content = &invocation.content;
        let lines = production_lines(content);
        let test_file = invocation.is_test_path();

        if !test_file {
            for line in lines.iter().filter(|l| !is_comment(l.text)) {
                if UNWRAP.is_match(line.text) {
                    findings.push(
                        Finding::block(
                            "quality.unwrap",
                            format!("line {}: unwrap() without error handling", line.number),
                        )
                        .with_hint("Propagate with ?: fn operation() -> Result<T, Error> { ... }"),
                    );
                }
                if PANIC.is_match(line.text) {
                    findings.push(
                        Finding::block(
                            "quality.panic",
                            format!("line {}: panic! in production code", line.number),
                        )
                        .with_hint("Return an error instead of aborting"),
                    );
                }
            }
        }

        let runtime = &self.config.quality.async_runtime;
        if ASYNC_FN.is_match(content) && !content.contains(runtime.as_str()) {
            findings.push(
                Finding::warn(
                    "quality.async_runtime",
                    format!("Async functions should use the runtime ({})", runtime),
                )
                .with_hint("Reference the project runtime explicitly, e.g. #[tokio::main]"),
            );
        }

        let aggregation = invocation
            .file_name()
            .map(|name| AGGREGATION_FILES.contains(&name.as_str()))
            .unwrap_or(false);
        if !test_file && !aggregation {
            for item in public_items(&lines, &["struct", "fn", "enum", "mod"]) {
                if !item.documented {
                    findings.push(
                        Finding::warn(
                            "quality.public_docs",
                            format!(
                                "line {}: public {} `{}` missing documentation",
                                item.line, item.kind, item.name
                            ),
                        )
                        .with_hint("Add /// comments for all public items"),
                    );
                }
            }
        }

        if !test_file {
            findings.extend(self.check_fallible_signatures(&lines));
        }

        findings
    }

    fn check_fallible_signatures(&self, lines: &[SourceLine<'_>]) -> Vec<Finding> {
        let prefixes = &self.config.quality.fallible_prefixes;

        fn_signatures(lines)
            .into_iter()
            .filter(|sig| !sig.is_test && sig.name != "main" && !sig.name.starts_with("test"))
            .filter(|sig| prefixes.iter().any(|p| sig.name.starts_with(p.as_str())))
            .filter(|sig| {
                sig.returns
                    .as_deref()
                    .map(|ret| !ret.contains("Result") && !ret.contains("Option"))
                    .unwrap_or(false)
            })
            .map(|sig| {
                Finding::warn(
                    "quality.fallible_return",
                    format!(
                        "line {}: `{}` looks fallible but returns {}",
                        sig.line,
                        sig.name,
                        sig.returns.as_deref().unwrap_or("()")
                    ),
                )
                .with_hint("Return Result<T, Error> for fallible operations")
            })
            .collect()
    }
}

#[async_trait]
impl Validator for QualityValidator {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn phase(&self) -> Phase {
        Phase::Pre
    }

    fn applies(&self, invocation: &ToolInvocation) -> bool {
        invocation.is_edit()
    }

    async fn evaluate(&self, invocation: &ToolInvocation) -> Vec<Finding> {
        if !self.is_source(invocation) {
            return Vec::new();
        }
        self.check(invocation)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::verdict::Severity;

    fn edit(path: &str, content: &str) -> ToolInvocation {
        ToolInvocation {
            tool_name: "Edit".to_string(),
            file_path: Some(PathBuf::from(path)),
            content: content.to_string(),
            ..Default::default()
        }
    }

    fn validator() -> QualityValidator {
        QualityValidator::new(Arc::new(Config::default()))
    }

    fn rules(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.rule.as_str()).collect()
    }

    #[tokio::test]
    async fn test_unwrap_blocks_in_production_file() {
        let src = "/// Reads.\npub fn value() -> Option<u8> {\n    let x = get().unwrap();\n    Some(x)\n}\n";
        let findings = validator().evaluate(&edit("src/store.rs", src)).await;

        assert_eq!(rules(&findings), vec!["quality.unwrap"]);
        assert_eq!(findings[0].severity, Severity::Block);
        assert!(findings[0].message.starts_with("line 3:"));
    }

    #[tokio::test]
    async fn test_each_occurrence_is_reported() {
        let src = "fn a() {\n    x.unwrap();\n    y.unwrap();\n    panic!(\"boom\");\n}\n";
        let findings = validator().evaluate(&edit("src/a.rs", src)).await;
        assert_eq!(
            rules(&findings),
            vec!["quality.unwrap", "quality.unwrap", "quality.panic"]
        );
    }

    #[tokio::test]
    async fn test_test_paths_and_test_modules_are_exempt() {
        let src = "fn a() {\n    x.unwrap();\n}\n";
        let findings = validator().evaluate(&edit("tests/flow.rs", src)).await;
        assert!(findings.is_empty());

        let src = "fn a() {}\n\n#[cfg(test)]\nmod tests {\n    fn t() { x.unwrap(); }\n}\n";
        let findings = validator().evaluate(&edit("src/a.rs", src)).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_code_after_cfg_test_item_is_checked() {
        let src = "#[cfg(test)]\nuse std::fmt;\n\nfn run() {\n    let v = load().unwrap();\n}\n\n#[cfg(test)]\nmod tests {}\n\nfn stop() {\n    panic!(\"boom\");\n}\n";
        let findings = validator().evaluate(&edit("src/run.rs", src)).await;

        assert_eq!(rules(&findings), vec!["quality.unwrap", "quality.panic"]);
        assert!(findings[0].message.starts_with("line 5:"));
        assert!(findings[1].message.starts_with("line 12:"));
    }

    #[tokio::test]
    async fn test_unwrap_or_is_fine() {
        let src = "fn a() -> u8 {\n    x.unwrap_or(0)\n}\n";
        let findings = validator().evaluate(&edit("src/a.rs", src)).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_async_without_runtime_warns() {
        let src = "async fn work() {}\n";
        let findings = validator().evaluate(&edit("src/a.rs", src)).await;
        assert_eq!(rules(&findings), vec!["quality.async_runtime"]);
        assert_eq!(findings[0].severity, Severity::Warn);

        let src = "async fn work() { tokio::task::yield_now().await }\n";
        let findings = validator().evaluate(&edit("src/a.rs", src)).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_undocumented_public_items_warn() {
        let src = "pub struct Plan;\n\n/// Documented.\npub enum Mode { A }\n";
        let findings = validator().evaluate(&edit("src/plan.rs", src)).await;
        assert_eq!(rules(&findings), vec!["quality.public_docs"]);
        assert!(findings[0].message.contains("`Plan`"));

        let findings = validator().evaluate(&edit("src/plan/mod.rs", src)).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_fallible_signature_warns() {
        let src = "fn parse_config(text: &str) -> Config {\n    todo()\n}\n\nfn main() -> u8 { 0 }\n";
        let findings = validator().evaluate(&edit("src/a.rs", src)).await;
        assert_eq!(rules(&findings), vec!["quality.fallible_return"]);
        assert!(findings[0].message.contains("`parse_config`"));

        let src = "fn parse_config(text: &str) -> Result<Config, Error> {\n    todo()\n}\n";
        let findings = validator().evaluate(&edit("src/a.rs", src)).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_non_source_files_ignored() {
        let findings = validator()
            .evaluate(&edit("README.md", "call unwrap() here"))
            .await;
        assert!(findings.is_empty());
    }

    #[test]
    fn test_applies_to_edit_tools_only() {
        let v = validator();
        assert!(v.applies(&edit("src/a.rs", "")));
        let bash = ToolInvocation {
            tool_name: "Bash".to_string(),
            ..Default::default()
        };
        assert!(!v.applies(&bash));
    }
}
