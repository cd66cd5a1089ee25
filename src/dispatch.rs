//! Event dispatch: decode, route, evaluate, reduce.
//!
//! Whatever goes wrong inside the gate itself resolves to Allow. Only findings
//! produced by validators can warn or block a tool call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::Error;
use crate::event::{HookEvent, Phase};
use crate::router::Router;
use crate::runner::CommandRunner;
use crate::verdict::{reduce, Verdict};

/// Runs routed validators for one event.
pub struct Dispatcher {
    router: Router,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Evaluate applicable validators sequentially, in router order.
    pub async fn dispatch(&self, event: &HookEvent, project_root: &Path) -> Verdict {
        let invocation = event.invocation(project_root);
        let mut findings = Vec::new();

        for validator in self.router.route(event.phase, &invocation) {
            let produced = validator.evaluate(&invocation).await;
            debug!(
                validator = validator.name(),
                findings = produced.len(),
                "Validator finished"
            );
            findings.extend(produced);
        }

        reduce(findings)
    }
}

/// Handle one serialized hook event end to end.
///
/// `project_root` overrides the event's `cwd`; with neither, the process
/// working directory is used.
pub async fn handle(
    raw: &str,
    phase: Phase,
    project_root: Option<PathBuf>,
    runner: Arc<dyn CommandRunner>,
) -> Verdict {
    let event = match HookEvent::parse(raw, phase) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed hook event");
            return Verdict::allow();
        }
    };

    match evaluate_isolated(event, project_root, runner).await {
        Ok(verdict) => verdict,
        Err(e) => {
            error!(error = %e, "Gate fault, allowing tool call");
            Verdict::allow()
        }
    }
}

/// Runs the evaluation on its own task so a panicking validator surfaces as an
/// error here instead of tearing down the process.
async fn evaluate_isolated(
    event: HookEvent,
    project_root: Option<PathBuf>,
    runner: Arc<dyn CommandRunner>,
) -> Result<Verdict, Error> {
    let root = resolve_root(project_root, &event)?;
    let config = Arc::new(Config::load(&root));
    let dispatcher = Dispatcher::new(Router::standard(config, runner));

    tokio::spawn(async move { dispatcher.dispatch(&event, &root).await })
        .await
        .map_err(|e| Error::other(format!("validator task failed: {}", e)))
}

fn resolve_root(project_root: Option<PathBuf>, event: &HookEvent) -> Result<PathBuf, Error> {
    match project_root.or_else(|| event.cwd.clone()) {
        Some(root) => Ok(root),
        None => Ok(std::env::current_dir()?),
    }
}
