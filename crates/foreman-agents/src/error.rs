use crate::types::Provider;
use thiserror::Error;

/// Errors raised by agent adapters and the adapter set. The orchestrator
/// catches all of these at its boundary and converts them into failed
/// `TaskResult`s; they never cross the orchestrator's public API.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no adapter registered for provider: {0}")]
    NoAdapter(Provider),
}

pub type Result<T> = std::result::Result<T, AgentError>;
