//! Findings, verdict reduction and the exit-code contract.

use std::fmt::Write as _;

/// Severity of a single finding. Ordered so that `max` picks the dominant one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warn,
    Block,
}

impl Severity {
    pub fn glyph(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ",
            Severity::Warn => "⚠",
            Severity::Block => "✗",
        }
    }
}

/// One diagnostic produced by a validator.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    /// `<category>.<rule>`, e.g. `quality.unwrap`.
    pub rule: String,
    /// Remediation guidance shown under the message.
    pub hint: Option<String>,
}

impl Finding {
    pub fn new(severity: Severity, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            rule: rule.into(),
            hint: None,
        }
    }

    pub fn block(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Block, rule, message)
    }

    pub fn warn(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, rule, message)
    }

    pub fn info(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, rule, message)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Validator category, the part of `rule` before the first dot.
    pub fn category(&self) -> &str {
        self.rule.split('.').next().unwrap_or(&self.rule)
    }
}

/// Reduced outcome for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    Allow,
    Warn,
    Block,
}

impl Outcome {
    /// Process exit code the host interprets: 0 pass, 1 advisory, 2 deny.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Allow => 0,
            Outcome::Warn => 1,
            Outcome::Block => 2,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Allow => write!(f, "allow"),
            Outcome::Warn => write!(f, "warn"),
            Outcome::Block => write!(f, "block"),
        }
    }
}

/// Findings of one event plus their reduced outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub findings: Vec<Finding>,
    pub outcome: Outcome,
}

impl Verdict {
    /// Neutral verdict used when the event could not be evaluated at all.
    pub fn allow() -> Self {
        Self {
            findings: Vec::new(),
            outcome: Outcome::Allow,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Human-readable diagnostics, grouped by category in finding order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.findings.is_empty() {
            return out;
        }

        let mut categories: Vec<&str> = Vec::new();
        for finding in &self.findings {
            if !categories.contains(&finding.category()) {
                categories.push(finding.category());
            }
        }

        for category in categories {
            let _ = writeln!(out, "[{}]", category);
            for finding in self.findings.iter().filter(|f| f.category() == category) {
                let _ = writeln!(out, "{} {}", finding.severity.glyph(), finding.message);
                if let Some(hint) = &finding.hint {
                    for line in hint.lines() {
                        let _ = writeln!(out, "  {}", line);
                    }
                }
            }
            out.push('\n');
        }

        let _ = match self.outcome {
            Outcome::Block => writeln!(out, "✗ qgate: blocked"),
            Outcome::Warn => writeln!(out, "⚠ qgate: passed with warnings"),
            Outcome::Allow => writeln!(out, "✓ qgate: passed"),
        };
        out
    }
}

/// Reduce findings to a verdict. Block dominates Warn dominates Info.
pub fn reduce(findings: Vec<Finding>) -> Verdict {
    let outcome = match findings.iter().map(|f| f.severity).max() {
        Some(Severity::Block) => Outcome::Block,
        Some(Severity::Warn) => Outcome::Warn,
        Some(Severity::Info) | None => Outcome::Allow,
    };
    Verdict { findings, outcome }
}
