use thiserror::Error;

pub type Result<T> = std::result::Result<T, StepflowError>;

#[derive(Debug, Error)]
pub enum StepflowError {
    #[error("workflow `{0}` has no steps")]
    EmptyWorkflow(String),
    #[error("workflow `{0}` not found")]
    WorkflowNotFound(String),
    #[error("workflow `{0}` is not active")]
    WorkflowInactive(String),
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),
    #[error("integration `{0}` not registered")]
    IntegrationNotRegistered(String),
    #[error("action `{action}` not registered on integration `{integration}`")]
    ActionNotRegistered { integration: String, action: String },
    #[error("unknown step type: {0}")]
    UnknownStepType(String),
    #[error("unresolved token `{{{{{0}}}}}`")]
    UnresolvedToken(String),
    #[error("invalid step config: {0}")]
    StepConfig(String),
    #[error("action failed: {0}")]
    Action(String),
    #[error("step handler panicked: {0}")]
    HandlerPanicked(String),
    #[error("execution store error: {0}")]
    Store(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for StepflowError {
    fn from(err: serde_json::Error) -> Self {
        StepflowError::Serialization(err.to_string())
    }
}
