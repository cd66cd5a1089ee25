//! Gate configuration.
//!
//! Loaded once at start-up from `.qgate/config.toml` (project) or `~/.qgate/config.toml`
//! (global) and shared read-only with every validator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Error;
use crate::metrics::{Direction, Target};

/// Effective qgate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub tests: TestsConfig,

    #[serde(default)]
    pub benchmark: BenchmarkConfig,

    #[serde(default)]
    pub coverage: CoverageConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Static source rules for edited files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// File extensions treated as source code.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Text an async source file must mention to count as using the project runtime.
    #[serde(default = "default_async_runtime")]
    pub async_runtime: String,

    /// Function name prefixes that suggest a fallible operation.
    #[serde(default = "default_fallible_prefixes")]
    pub fallible_prefixes: Vec<String>,
}

/// Test command requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestsConfig {
    #[serde(default = "default_test_command")]
    pub command: Vec<String>,

    #[serde(default = "default_test_timeout")]
    pub timeout_secs: u64,

    /// Integration test directory, relative to the project root.
    #[serde(default = "default_tests_dir")]
    pub tests_dir: String,

    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: String,

    /// Project manifest holding dependency declarations.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    #[serde(default = "default_property_crate")]
    pub property_crate: String,

    /// Any of these on the command line counts as requesting coverage.
    #[serde(default = "default_coverage_flags")]
    pub coverage_flags: Vec<String>,

    /// Trailing lines of captured output carried in a failure finding.
    #[serde(default = "default_output_lines")]
    pub max_output_lines: usize,
}

/// Benchmark run and performance targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default = "default_bench_command")]
    pub command: Vec<String>,

    #[serde(default = "default_bench_timeout")]
    pub timeout_secs: u64,

    /// Fraction above a higher-is-better threshold still reported as a near miss.
    #[serde(default = "default_near_margin")]
    pub near_margin: f64,

    #[serde(default = "default_bench_targets")]
    pub targets: Vec<Target>,

    /// Captured output lines kept in a failed-run finding.
    #[serde(default = "default_output_lines")]
    pub max_output_lines: usize,
}

/// Coverage run and target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    #[serde(default = "default_coverage_command")]
    pub command: Vec<String>,

    #[serde(default = "default_coverage_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_coverage_fallback")]
    pub fallback_command: Vec<String>,

    #[serde(default = "default_coverage_fallback_timeout")]
    pub fallback_timeout_secs: u64,

    /// Minimum total line coverage, in percent.
    #[serde(default = "default_coverage_target")]
    pub target: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_source_extensions() -> Vec<String> {
    strings(&["rs"])
}

fn default_async_runtime() -> String {
    "tokio::".to_string()
}

fn default_fallible_prefixes() -> Vec<String> {
    strings(&[
        "parse", "load", "read", "open", "connect", "fetch", "decode", "try_", "save", "write",
    ])
}

fn default_test_command() -> Vec<String> {
    strings(&["cargo", "test", "--", "--nocapture"])
}

fn default_test_timeout() -> u64 {
    120
}

fn default_tests_dir() -> String {
    "tests".to_string()
}

fn default_fixtures_dir() -> String {
    "fixtures".to_string()
}

fn default_manifest() -> String {
    "Cargo.toml".to_string()
}

fn default_property_crate() -> String {
    "proptest".to_string()
}

fn default_coverage_flags() -> Vec<String> {
    strings(&["--cov", "--coverage"])
}

fn default_output_lines() -> usize {
    40
}

fn default_bench_command() -> Vec<String> {
    strings(&["cargo", "bench", "--", "--output-format", "json"])
}

fn default_bench_timeout() -> u64 {
    300
}

fn default_near_margin() -> f64 {
    0.10
}

fn default_bench_targets() -> Vec<Target> {
    vec![
        Target::new("planning_time", 100.0, Direction::LowerIsBetter).with_unit("ms"),
        Target::new("cache_hit_rate", 60.0, Direction::HigherIsBetter).with_unit("%"),
        Target::new("throughput", 10_000.0, Direction::HigherIsBetter).with_unit("req/hour"),
    ]
}

fn default_coverage_command() -> Vec<String> {
    strings(&["cargo", "tarpaulin", "--out", "json", "--all-features"])
}

fn default_coverage_timeout() -> u64 {
    180
}

fn default_coverage_fallback() -> Vec<String> {
    strings(&["cargo", "test", "--", "--coverage"])
}

fn default_coverage_fallback_timeout() -> u64 {
    120
}

fn default_coverage_target() -> f64 {
    82.0
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            source_extensions: default_source_extensions(),
            async_runtime: default_async_runtime(),
            fallible_prefixes: default_fallible_prefixes(),
        }
    }
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            command: default_test_command(),
            timeout_secs: default_test_timeout(),
            tests_dir: default_tests_dir(),
            fixtures_dir: default_fixtures_dir(),
            manifest: default_manifest(),
            property_crate: default_property_crate(),
            coverage_flags: default_coverage_flags(),
            max_output_lines: default_output_lines(),
        }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            command: default_bench_command(),
            timeout_secs: default_bench_timeout(),
            near_margin: default_near_margin(),
            targets: default_bench_targets(),
            max_output_lines: default_output_lines(),
        }
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            command: default_coverage_command(),
            timeout_secs: default_coverage_timeout(),
            fallback_command: default_coverage_fallback(),
            fallback_timeout_secs: default_coverage_fallback_timeout(),
            target: default_coverage_target(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TestsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BenchmarkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CoverageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback_timeout_secs)
    }

    /// Coverage target expressed as a threshold on `total_coverage`.
    pub fn total_target(&self) -> Target {
        Target::new("total_coverage", self.target, Direction::HigherIsBetter).with_unit("%")
    }
}

impl Config {
    /// Path to the global qgate directory (~/.qgate/).
    pub fn global_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".qgate")
    }

    /// Project-level config file path.
    pub fn project_path(project_root: &Path) -> PathBuf {
        project_root.join(".qgate").join("config.toml")
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Load the effective config for a project.
    ///
    /// The project file wins over the global one. A broken file is reported and
    /// skipped; the gate then runs on defaults rather than failing.
    pub fn load(project_root: &Path) -> Self {
        let candidates = [
            Self::project_path(project_root),
            Self::global_dir().join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::from_file(path) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config");
                    return config;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                }
            }
        }

        Self::default()
    }

    /// Render as TOML for `qgate config`.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::other(e.to_string()))
    }
}
