//! Documentation completeness for edited files.

use std::sync::Arc;

use async_trait::async_trait;

use super::source::{doc_blocks, production_lines, public_items};
use super::Validator;
use crate::config::Config;
use crate::event::{Phase, ToolInvocation};
use crate::verdict::Finding;

const README_SECTIONS: &[&str] = &["Installation", "Usage", "Examples"];

/// Checks API doc comments in source files and required README sections.
pub struct DocumentationValidator {
    config: Arc<Config>,
}

impl DocumentationValidator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn check_source(&self, content: &str) -> Vec<Finding> {
        let lines = production_lines(content);
        let mut findings = Vec::new();

        for item in public_items(&lines, &["struct", "fn", "enum", "trait"]) {
            if !item.documented {
                findings.push(
                    Finding::block(
                        "documentation.public_api",
                        format!("Public {} '{}' missing documentation", item.kind, item.name),
                    )
                    .with_hint(format!("Add /// comments before {} {}", item.kind, item.name)),
                );
            }
        }

        let missing_example = doc_blocks(&lines).iter().any(|doc| {
            (doc.contains("Arguments") || doc.contains("Returns")) && !doc.contains("Example")
        });
        if missing_example {
            findings.push(Finding::warn(
                "documentation.examples",
                "Consider adding # Examples section to documentation",
            ));
        }

        findings
    }

    fn check_readme(&self, content: &str) -> Vec<Finding> {
        let lower = content.to_lowercase();
        let mut findings: Vec<Finding> = README_SECTIONS
            .iter()
            .filter(|section| !lower.contains(&section.to_lowercase()))
            .map(|section| {
                Finding::warn(
                    "documentation.readme",
                    format!("README missing '{}' section", section),
                )
            })
            .collect();

        if !lower.contains("example") {
            findings.push(Finding::warn(
                "documentation.readme",
                "README should include usage examples",
            ));
        }
        findings
    }
}

#[async_trait]
impl Validator for DocumentationValidator {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn phase(&self) -> Phase {
        Phase::Post
    }

    fn applies(&self, invocation: &ToolInvocation) -> bool {
        invocation.is_edit()
    }

    async fn evaluate(&self, invocation: &ToolInvocation) -> Vec<Finding> {
        let is_source = invocation
            .extension()
            .map(|ext| self.config.quality.source_extensions.contains(&ext))
            .unwrap_or(false);

        if is_source {
            return self.check_source(&invocation.content);
        }
        if invocation.file_stem().as_deref() == Some("readme") {
            return self.check_readme(&invocation.content);
        }
        Vec::new()
    }
}
