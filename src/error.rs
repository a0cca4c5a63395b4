//! Error types surfaced by the engine.
//!
//! Unresolved intent and discovery failures are absorbed where they occur
//! (they degrade to defaults and are logged).  Only the variants below ever
//! reach a caller.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by the query execution collaborator.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("not authenticated against the telemetry platform")]
    Unauthenticated,
    #[error("telemetry platform unreachable: {0}")]
    Unreachable(String),
    #[error("query rejected: {0}")]
    Rejected(String),
    #[error("query timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Errors returned by the engine, registry and tool surface.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown capability: {0}")]
    UnknownCapability(String),
    #[error("could not generate capability `{name}`: {reason}")]
    GenerationFailed { name: String, reason: String },
    #[error("capability `{0}` has no query pattern")]
    NotInvokable(String),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("data source discovery failed: {0}")]
    Discovery(String),
}

impl EngineError {
    /// Stable machine-readable tag used in tagged failure results.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::UnknownCapability(_) => "unknown_capability",
            EngineError::GenerationFailed { .. } => "unknown_capability",
            EngineError::NotInvokable(_) | EngineError::Execution(_) => "execution_failure",
            EngineError::Discovery(_) => "discovery_failure",
        }
    }
}
