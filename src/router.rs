//! Validator selection per event.

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::event::{Phase, ToolInvocation};
use crate::runner::CommandRunner;
use crate::validators::{
    BenchmarkValidator, CoverageValidator, DocumentationValidator, QualityValidator,
    TestRequirementsValidator, Validator,
};

/// Validators registered at start-up, in declaration order.
pub struct Router {
    validators: Vec<Box<dyn Validator>>,
}

impl Router {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    /// The five gate validators sharing one config and one process runner.
    pub fn standard(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(vec![
            Box::new(QualityValidator::new(config.clone())),
            Box::new(TestRequirementsValidator::new(config.clone(), runner.clone())),
            Box::new(BenchmarkValidator::new(config.clone(), runner.clone())),
            Box::new(CoverageValidator::new(config.clone(), runner)),
            Box::new(DocumentationValidator::new(config)),
        ])
    }

    /// Validators whose phase and applicability predicate match, in
    /// declaration order. Non-matching validators are never evaluated.
    pub fn route(&self, phase: Phase, invocation: &ToolInvocation) -> Vec<&dyn Validator> {
        let selected: Vec<&dyn Validator> = self
            .validators
            .iter()
            .map(|v| v.as_ref())
            .filter(|v| v.phase() == phase && v.applies(invocation))
            .collect();

        debug!(
            phase = %phase,
            tool = %invocation.tool_name,
            validators = ?selected.iter().map(|v| v.name()).collect::<Vec<_>>(),
            "Routed event"
        );
        selected
    }
}
