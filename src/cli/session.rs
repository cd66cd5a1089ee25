//! Session-start summary of project agents and stack.
//!
//! Agent definitions live in `.claude/agents/<id>-agent.md` with a YAML front
//! matter block:
//!
//! ```text
//! ---
//! name: Verification
//! description: Checks work before completion
//! trigger:
//!   - verify before completion
//!   - run the checks
//! ---
//! ```

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;

const AGENT_SUFFIX: &str = "-agent";
const SHOWN_TRIGGERS: usize = 3;

/// Crates reported as part of the detected stack, with their role.
const STACK: &[(&str, &str)] = &[
    ("tokio", "Async runtime"),
    ("serde", "Serialization"),
    ("tracing", "Logging"),
];

#[derive(Debug, Deserialize)]
struct FrontMatter {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    trigger: Option<Value>,
}

/// One agent definition.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSummary {
    /// File stem without the `-agent` suffix.
    pub id: String,
    pub name: String,
    pub description: String,
    pub triggers: Vec<String>,
}

pub fn agents_dir(project_root: &Path) -> PathBuf {
    project_root.join(".claude").join("agents")
}

/// Parse an agent definition's front matter.
pub fn parse_agent(id: &str, content: &str) -> Result<AgentSummary, Error> {
    let body = content
        .trim_start()
        .strip_prefix("---")
        .ok_or_else(|| Error::other("missing front matter"))?;
    let (yaml, _) = body
        .split_once("\n---")
        .ok_or_else(|| Error::other("unterminated front matter"))?;

    let front: FrontMatter = serde_yaml::from_str(yaml)?;
    Ok(AgentSummary {
        id: id.to_string(),
        name: front.name,
        description: front.description.trim().to_string(),
        triggers: triggers(front.trigger),
    })
}

/// `trigger` may be a single phrase or a list of phrases.
fn triggers(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::String(phrase)) => vec![phrase],
        Some(Value::Sequence(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(phrase) => Some(phrase),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Load every readable agent definition, sorted by id.
pub fn load_agents(project_root: &Path) -> Vec<AgentSummary> {
    let Ok(entries) = std::fs::read_dir(agents_dir(project_root)) else {
        return Vec::new();
    };

    let mut agents: Vec<AgentSummary> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                return None;
            }
            let id = path
                .file_stem()?
                .to_str()?
                .strip_suffix(AGENT_SUFFIX)?
                .to_string();

            let parsed = std::fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|content| parse_agent(&id, &content));
            match parsed {
                Ok(agent) => Some(agent),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping agent definition");
                    None
                }
            }
        })
        .collect();

    agents.sort_by(|a, b| a.id.cmp(&b.id));
    agents
}

/// Stack crates declared in the manifest's dependency tables.
pub fn detect_stack(manifest: &Path) -> Vec<(&'static str, &'static str)> {
    let Ok(text) = std::fs::read_to_string(manifest) else {
        return Vec::new();
    };
    let table: toml::Table = match toml::from_str(&text) {
        Ok(table) => table,
        Err(e) => {
            warn!(path = %manifest.display(), error = %e, "Could not parse manifest");
            return Vec::new();
        }
    };

    let mut declared = HashSet::new();
    let sections = [
        table.get("dependencies"),
        table.get("dev-dependencies"),
        table
            .get("workspace")
            .and_then(|w| w.get("dependencies")),
    ];
    for deps in sections.into_iter().flatten().filter_map(|d| d.as_table()) {
        declared.extend(deps.keys().cloned());
    }

    STACK
        .iter()
        .filter(|(krate, _)| declared.contains(*krate))
        .copied()
        .collect()
}

pub fn render(agents: &[AgentSummary], stack: &[(&str, &str)]) -> String {
    let mut out = String::new();
    if agents.is_empty() {
        out.push_str("⚠ No agents found in .claude/agents/\n");
        return out;
    }

    out.push_str("Available agents:\n\n");
    for agent in agents {
        let _ = writeln!(out, "  {}", agent.name);
        if !agent.description.is_empty() {
            let _ = writeln!(out, "    {}", agent.description);
        }
        if !agent.triggers.is_empty() {
            let shown = agent
                .triggers
                .iter()
                .take(SHOWN_TRIGGERS)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(out, "    Triggers: {}", shown);
            if agent.triggers.len() > SHOWN_TRIGGERS {
                let _ = write!(out, " (and {} more)", agent.triggers.len() - SHOWN_TRIGGERS);
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !stack.is_empty() {
        out.push_str("Detected Rust project with dependencies:\n");
        for (krate, role) in stack {
            let _ = writeln!(out, "  ✓ {}: {}", role, krate);
        }
    }
    out
}

/// Print the summary to stderr. Never fails; missing pieces are just omitted.
pub fn run(project_root: &Path, config: &Config) {
    let agents = load_agents(project_root);
    let stack = detect_stack(&project_root.join(&config.tests.manifest));
    eprint!("{}", render(&agents, &stack));
}
