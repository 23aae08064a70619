use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForemanError {
    #[error("not initialized: run 'foreman init'")]
    NotInitialized,

    #[error("no active project state")]
    NoProject,

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid project id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidProjectId(String),

    #[error("gate not registered: {0}")]
    GateNotRegistered(String),

    #[error("unknown gate decision '{0}': expected approve, revise, pause, or abort")]
    UnknownDecision(String),

    #[error("unknown target cli: {0}")]
    UnknownTargetCli(String),

    #[error("no checkpoint found at {0}")]
    NoCheckpoint(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForemanError>;
