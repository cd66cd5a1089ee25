//! Rule units that map one tool invocation to findings.

pub mod benchmark;
pub mod coverage;
pub mod documentation;
pub mod quality;
pub mod source;
pub mod test_requirements;

use async_trait::async_trait;

use crate::event::{Phase, ToolInvocation};
use crate::verdict::Finding;

pub use benchmark::BenchmarkValidator;
pub use coverage::CoverageValidator;
pub use documentation::DocumentationValidator;
pub use quality::QualityValidator;
pub use test_requirements::TestRequirementsValidator;

/// Shared interface of all validators.
///
/// `evaluate` must not fail: tool faults and timeouts come back as findings.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Category used as the finding rule prefix.
    fn name(&self) -> &'static str;

    /// Hook phase the validator runs in.
    fn phase(&self) -> Phase;

    /// Applicability predicate on tool identity and command.
    fn applies(&self, invocation: &ToolInvocation) -> bool;

    async fn evaluate(&self, invocation: &ToolInvocation) -> Vec<Finding>;
}
