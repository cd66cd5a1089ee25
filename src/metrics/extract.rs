//! Best-effort recovery of metrics from measurement tool output.
//!
//! Extractors are tried in order; the first one that recognises the output format wins.
//! A metric missing from the output is simply absent from the result.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// One measured value.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub key: String,
    pub value: f64,
}

/// Metrics recovered from one tool run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    values: BTreeMap<String, f64>,
    /// Per-module breakdown, e.g. coverage per source module.
    pub submetrics: BTreeMap<String, f64>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn insert_submetric(&mut self, name: impl Into<String>, value: f64) {
        self.submetrics.insert(name.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// No top-level metric was found; submetrics are not counted.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        self.values.iter().map(|(key, value)| Metric {
            key: key.clone(),
            value: *value,
        })
    }
}

/// A single output format reader.
pub trait Extract: Send + Sync {
    /// `None` means the output is not in this extractor's format.
    fn extract(&self, raw: &str) -> Option<MetricSet>;
}

/// Ordered extractor chain, structured readers first.
pub struct ExtractorChain {
    extractors: Vec<Box<dyn Extract>>,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn Extract>>) -> Self {
        Self { extractors }
    }

    /// Never fails; degrades to an empty set.
    pub fn extract(&self, raw: &str) -> MetricSet {
        let set = self
            .extractors
            .iter()
            .find_map(|e| e.extract(raw))
            .unwrap_or_default();
        for metric in set.iter() {
            debug!(metric = %metric.key, value = metric.value, "Extracted metric");
        }
        set
    }
}

// =============================================================================
// Structured (JSON) output
// =============================================================================

/// Reads a JSON object report, mapping field aliases to metric keys.
#[derive(Debug, Clone, Default)]
pub struct JsonExtractor {
    fields: Vec<(String, Vec<String>)>,
    file_coverage: bool,
}

impl JsonExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `key` from the first present alias.
    pub fn field(mut self, key: &str, aliases: &[&str]) -> Self {
        self.fields.push((
            key.to_string(),
            aliases.iter().map(|a| a.to_string()).collect(),
        ));
        self
    }

    /// Also read tarpaulin-style `files[]` entries (`covered` / `coverable`) as
    /// per-module percentages.
    pub fn with_file_coverage(mut self) -> Self {
        self.file_coverage = true;
        self
    }

    fn collect_file_coverage(obj: &Map<String, Value>, set: &mut MetricSet) {
        let Some(files) = obj.get("files").and_then(|f| f.as_array()) else {
            return;
        };

        for file in files {
            let covered = file.get("covered").and_then(number);
            let coverable = file.get("coverable").and_then(number);
            let (Some(covered), Some(coverable)) = (covered, coverable) else {
                continue;
            };
            if coverable <= 0.0 {
                continue;
            }
            if let Some(name) = file.get("path").and_then(module_name) {
                set.insert_submetric(name, covered / coverable * 100.0);
            }
        }
    }
}

impl Extract for JsonExtractor {
    fn extract(&self, raw: &str) -> Option<MetricSet> {
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        let obj = value.as_object()?;

        let mut set = MetricSet::new();
        for (key, aliases) in &self.fields {
            if let Some(v) = aliases.iter().find_map(|a| obj.get(a).and_then(number)) {
                set.insert(key.clone(), v);
            }
        }
        if self.file_coverage {
            Self::collect_file_coverage(obj, &mut set);
        }
        Some(set)
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Module name for a report path: the file stem, or the parent directory for
/// `mod.rs` / `lib.rs`.
fn module_name(path: &Value) -> Option<String> {
    let segments: Vec<&str> = match path {
        Value::String(s) => s.split('/').filter(|p| !p.is_empty()).collect(),
        Value::Array(parts) => parts.iter().filter_map(|p| p.as_str()).collect(),
        _ => return None,
    };

    let file = *segments.last()?;
    let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
    if matches!(stem, "mod" | "lib") && segments.len() >= 2 {
        return Some(segments[segments.len() - 2].to_string());
    }
    Some(stem.to_string())
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().replace(',', "").parse().ok()
}

// =============================================================================
// Text output
// =============================================================================

/// Named regex rule; the first capture group is the value.
#[derive(Debug, Clone)]
struct PatternRule {
    key: String,
    patterns: Vec<Regex>,
}

/// `name value%` pairs collected as submetrics.
#[derive(Debug, Clone)]
struct SubmetricRule {
    pattern: Regex,
    excluded: Vec<String>,
}

/// Pattern-based fallback for free-form text output.
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    rules: Vec<PatternRule>,
    submetrics: Option<SubmetricRule>,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patterns are tried in order; the first match sets the metric.
    pub fn rule(mut self, key: &str, patterns: &[&Regex]) -> Self {
        self.rules.push(PatternRule {
            key: key.to_string(),
            patterns: patterns.iter().map(|r| (*r).clone()).collect(),
        });
        self
    }

    /// Collect `(name, value)` captures as submetrics, skipping `excluded` names.
    pub fn submetrics(mut self, pattern: &Regex, excluded: &[&str]) -> Self {
        self.submetrics = Some(SubmetricRule {
            pattern: pattern.clone(),
            excluded: excluded.iter().map(|e| e.to_lowercase()).collect(),
        });
        self
    }
}

impl Extract for PatternExtractor {
    fn extract(&self, raw: &str) -> Option<MetricSet> {
        let mut set = MetricSet::new();

        for rule in &self.rules {
            let value = rule.patterns.iter().find_map(|re| {
                re.captures(raw)
                    .and_then(|c| c.get(1))
                    .and_then(|m| parse_number(m.as_str()))
            });
            if let Some(value) = value {
                set.insert(rule.key.clone(), value);
            }
        }

        if let Some(sub) = &self.submetrics {
            for caps in sub.pattern.captures_iter(raw) {
                let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                if sub.excluded.contains(&name.as_str().to_lowercase()) {
                    continue;
                }
                if let Some(value) = parse_number(value.as_str()) {
                    set.insert_submetric(name.as_str(), value);
                }
            }
        }

        Some(set)
    }
}

// =============================================================================
// Named patterns per metric key
// =============================================================================

static PLANNING_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)planning:\s+([\d.]+)\s*ms").expect("planning regex"));

static CACHE_HIT_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)cache.*?(\d+\.?\d*)\s*%").expect("cache regex"));

static THROUGHPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)throughput:\s+(\d[\d,]*(?:\.\d+)?)").expect("throughput regex")
});

static COVERAGE_TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)coverage:\s+(\d+\.?\d*)%").expect("coverage regex"));

// tarpaulin summary line: "85.00% coverage, 100/120 lines covered"
static COVERAGE_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+\.?\d*)%\s+coverage").expect("coverage summary regex")
});

static MODULE_COVERAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s+(\d+\.?\d*)%").expect("module coverage regex"));

/// Extractor chain for benchmark runner output.
pub fn benchmark_extractor() -> ExtractorChain {
    ExtractorChain::new(vec![
        Box::new(
            JsonExtractor::new()
                .field("planning_time", &["planning_time", "planning_time_ms"])
                .field("cache_hit_rate", &["cache_hit_rate"])
                .field("throughput", &["throughput"]),
        ),
        Box::new(
            PatternExtractor::new()
                .rule("planning_time", &[&*PLANNING_TIME])
                .rule("cache_hit_rate", &[&*CACHE_HIT_RATE])
                .rule("throughput", &[&*THROUGHPUT]),
        ),
    ])
}

/// Extractor chain for coverage tool output.
pub fn coverage_extractor() -> ExtractorChain {
    ExtractorChain::new(vec![
        Box::new(
            JsonExtractor::new()
                .field("total_coverage", &["coverage_percent", "coverage"])
                .with_file_coverage(),
        ),
        Box::new(
            PatternExtractor::new()
                .rule("total_coverage", &[&*COVERAGE_TOTAL, &*COVERAGE_SUMMARY])
                .submetrics(&MODULE_COVERAGE, &["coverage", "total"]),
        ),
    ])
}
