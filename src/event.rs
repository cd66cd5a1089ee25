//! Hook event decoding.
//!
//! One JSON object arrives on stdin per invocation:
//! `{ "tool_name": "...", "tool_input": { "command"?, "filePath"?, "content"? } }`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Error;

/// Tools whose input carries a shell command.
pub const SHELL_TOOLS: &[&str] = &["Bash"];

/// Tools whose input carries an edited file.
pub const EDIT_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit"];

/// When the hook fires relative to the tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pre,
    Post,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Pre => write!(f, "pre"),
            Phase::Post => write!(f, "post"),
        }
    }
}

/// Wire shape of the incoming payload.
#[derive(Debug, Deserialize)]
struct RawEvent {
    tool_name: Option<String>,
    #[serde(default)]
    tool_input: Option<Value>,
    #[serde(default)]
    cwd: Option<String>,
}

/// A decoded hook event. Never mutated after decoding.
#[derive(Debug, Clone)]
pub struct HookEvent {
    pub phase: Phase,
    pub tool_name: String,
    pub tool_input: Map<String, Value>,
    /// Working directory reported by the host, if any.
    pub cwd: Option<PathBuf>,
}

impl HookEvent {
    /// Decode one serialized event.
    pub fn parse(raw: &str, phase: Phase) -> Result<Self, Error> {
        let raw: RawEvent = serde_json::from_str(raw.trim())
            .map_err(|e| Error::malformed(format!("not a JSON event object: {}", e)))?;

        let tool_name = raw
            .tool_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::malformed("missing tool_name"))?;

        let tool_input = match raw.tool_input {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(Error::malformed(format!(
                    "tool_input must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(Self {
            phase,
            tool_name,
            tool_input,
            cwd: raw.cwd.filter(|c| !c.is_empty()).map(PathBuf::from),
        })
    }

    /// Normalized view for validators.
    pub fn invocation(&self, project_root: &Path) -> ToolInvocation {
        ToolInvocation {
            tool_name: self.tool_name.clone(),
            command: self.str_field(&["command"]).unwrap_or_default(),
            file_path: self
                .str_field(&["filePath", "file_path"])
                .map(PathBuf::from),
            content: self.content(),
            project_root: project_root.to_path_buf(),
        }
    }

    fn str_field(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| self.tool_input.get(*key).and_then(|v| v.as_str()))
            .map(|s| s.to_string())
    }

    /// Edited text: `content` as a string or `{ text }`, else `new_string`, else
    /// the concatenated `edits[].new_string` of a multi-edit.
    fn content(&self) -> String {
        match self.tool_input.get("content") {
            Some(Value::String(text)) => return text.clone(),
            Some(Value::Object(obj)) => {
                if let Some(text) = obj.get("text").and_then(|t| t.as_str()) {
                    return text.to_string();
                }
            }
            _ => {}
        }

        if let Some(text) = self.str_field(&["new_string"]) {
            return text;
        }

        self.tool_input
            .get("edits")
            .and_then(|e| e.as_array())
            .map(|edits| {
                edits
                    .iter()
                    .filter_map(|e| e.get("new_string").and_then(|s| s.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fields of a tool call that validators look at.
#[derive(Debug, Clone, Default)]
pub struct ToolInvocation {
    pub tool_name: String,
    /// Shell command, empty for non-shell tools.
    pub command: String,
    pub file_path: Option<PathBuf>,
    /// Edited text, empty when none was sent.
    pub content: String,
    /// Directory external tools run in and project files are read from.
    pub project_root: PathBuf,
}

impl ToolInvocation {
    pub fn is_shell(&self) -> bool {
        SHELL_TOOLS.contains(&self.tool_name.as_str())
    }

    pub fn is_edit(&self) -> bool {
        EDIT_TOOLS.contains(&self.tool_name.as_str())
    }

    /// Whether the shell command mentions `needle`.
    pub fn command_contains(&self, needle: &str) -> bool {
        self.command.contains(needle)
    }

    /// Lowercased file extension of the edited file.
    pub fn extension(&self) -> Option<String> {
        self.file_path
            .as_ref()
            .and_then(|p| p.extension())
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Lowercased file name of the edited file.
    pub fn file_name(&self) -> Option<String> {
        self.file_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_lowercase())
    }

    /// Lowercased file name without its extension.
    pub fn file_stem(&self) -> Option<String> {
        self.file_path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|n| n.to_string_lossy().to_lowercase())
    }

    /// Test-marked files are exempt from production code rules.
    pub fn is_test_path(&self) -> bool {
        self.file_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_lowercase().contains("test"))
            .unwrap_or(false)
    }
}
