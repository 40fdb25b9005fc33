pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod integration;
pub mod runtime;
pub mod state;
pub mod template;
pub mod utils;
pub mod workflow;

pub use config::{EngineConfig, EnvConfig, WebhookConfig};
pub use dispatch::{
    DispatchOutcome, Dispatcher, MemoryWorkflowSource, TriggerEvent, WorkflowSource,
};
pub use error::{Result, StepflowError};
pub use integration::{action_fn, ActionHandler, FnAction, Integration, IntegrationRegistry};
pub use runtime::{
    ExecutionContext, ExecutionRecord, ExecutionStatus, StepOutcome, StepResult,
    WorkflowExecutor, WorkflowRun,
};
#[cfg(feature = "redis-store")]
pub use state::RedisStore;
pub use state::{ExecutionStore, MemoryStore};
pub use template::{resolve, resolve_with_mode, TokenMode};
pub use utils::{logging, validation};
pub use workflow::{
    load_workflow_from_file, load_workflow_from_str, load_workflow_from_value, Step, StepKind,
    TriggerDescriptor, Workflow, WorkflowStatus,
};
