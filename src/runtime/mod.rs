// 运行时执行引擎模块

mod context;
mod executor;
mod steps;
mod types;

pub use context::ExecutionContext;
pub use executor::{next_execution_id, WorkflowExecutor};
pub use steps::{delay_millis, BuiltinSteps, DEFAULT_LOG_MESSAGE};
pub use types::{ExecutionRecord, ExecutionStatus, StepOutcome, StepResult, WorkflowRun};
