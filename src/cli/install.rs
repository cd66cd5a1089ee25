//! Hook registration in the project's `.claude/settings.json`.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::info;

use crate::error::Error;

/// Tools the gate hooks listen to.
const TOOL_MATCHER: &str = "Bash|Edit|Write|MultiEdit";

/// Every command we register starts with this; used to recognize our own entries.
const COMMAND_PREFIX: &str = "qgate ";

/// Hook event name and the entry registered for it.
fn qgate_entries() -> [(&'static str, Value); 3] {
    [
        (
            "PreToolUse",
            json!({
                "matcher": TOOL_MATCHER,
                "hooks": [{ "type": "command", "command": "qgate pre" }]
            }),
        ),
        (
            "PostToolUse",
            json!({
                "matcher": TOOL_MATCHER,
                "hooks": [{ "type": "command", "command": "qgate post" }]
            }),
        ),
        (
            "SessionStart",
            json!({
                "hooks": [{ "type": "command", "command": "qgate session" }]
            }),
        ),
    ]
}

pub fn settings_path(project_root: &Path) -> PathBuf {
    project_root.join(".claude").join("settings.json")
}

/// Merge qgate hook entries into a settings file.
///
/// Existing qgate entries are replaced, everything else is kept as is. The
/// previous file is copied to `backup_path` first.
pub fn merge_settings(path: &Path, backup_path: &Path) -> Result<(), Error> {
    let content = if path.exists() {
        std::fs::copy(path, backup_path)?;
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut settings: Value = if content.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&content)?
    };

    let root = settings
        .as_object_mut()
        .ok_or_else(|| Error::other(format!("{} is not a JSON object", path.display())))?;
    let hooks = root
        .entry("hooks")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| Error::other("\"hooks\" is not a JSON object"))?;

    for (event, entry) in qgate_entries() {
        let list = hooks
            .entry(event)
            .or_insert_with(|| json!([]))
            .as_array_mut()
            .ok_or_else(|| Error::other(format!("\"hooks.{}\" is not an array", event)))?;
        list.retain(|existing| !is_qgate_entry(existing));
        list.push(entry);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let output = serde_json::to_string_pretty(&settings)?;
    std::fs::write(path, output)?;

    Ok(())
}

fn is_qgate_entry(entry: &Value) -> bool {
    entry
        .get("hooks")
        .and_then(|h| h.as_array())
        .map(|hooks| {
            hooks.iter().any(|h| {
                h.get("command")
                    .and_then(|c| c.as_str())
                    .map(|c| c.starts_with(COMMAND_PREFIX))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

/// Register the gate for the project at `project_root`.
pub fn run(project_root: &Path) -> Result<(), Error> {
    let path = settings_path(project_root);
    let backup = path.with_file_name("settings.json.qgate.bak");

    merge_settings(&path, &backup)?;
    info!(path = %path.display(), "Installed qgate hooks");

    println!("Registered qgate hooks in {}", path.display());
    println!("  PreToolUse   qgate pre");
    println!("  PostToolUse  qgate post");
    println!("  SessionStart qgate session");
    Ok(())
}
