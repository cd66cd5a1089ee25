//! Metric extraction and threshold evaluation.

pub mod extract;
pub mod threshold;

pub use extract::{
    benchmark_extractor, coverage_extractor, Extract, ExtractorChain, JsonExtractor, Metric,
    MetricSet, PatternExtractor,
};
pub use threshold::{evaluate, Direction, SeverityPolicy, Target};
