//! Error types for qgate.

use thiserror::Error;

/// Gate error type.
///
/// Faults from external measurement tools are not represented here; the runner
/// reports them as a [`crate::runner::RunOutcome`] and validators turn them into findings.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedEvent(msg.into())
    }
}
