// 工作流定义与加载

pub mod loader;
mod types;

pub use loader::{
    load_workflow_from_file, load_workflow_from_str, load_workflow_from_value, payload_from_value,
};
pub use types::{Step, StepKind, TriggerDescriptor, Workflow, WorkflowStatus};
