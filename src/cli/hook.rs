//! `qgate pre` / `qgate post`: gate one tool call.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::dispatch;
use crate::event::Phase;
use crate::runner::SystemRunner;

/// Read one event from stdin, print diagnostics to stderr and return the exit
/// code for the host.
pub async fn run(phase: Phase, project_root: Option<PathBuf>) -> i32 {
    let mut raw = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut raw).await {
        warn!(error = %e, "Could not read hook event from stdin");
        return 0;
    }

    let verdict = dispatch::handle(&raw, phase, project_root, Arc::new(SystemRunner)).await;

    let report = verdict.render();
    if !report.is_empty() {
        eprint!("{}", report);
    }
    verdict.exit_code()
}
