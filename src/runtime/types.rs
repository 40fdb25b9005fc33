use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 执行状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

/// 单步结果：成功携带 `result`，失败携带 `error`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Success { result: Value },
    Error { error: String },
}

/// 单个步骤的执行记录，`step` 从 1 开始
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: usize,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn success(step: usize, step_type: impl Into<String>, result: Value) -> Self {
        Self {
            step,
            step_type: step_type.into(),
            outcome: StepOutcome::Success { result },
        }
    }

    pub fn error(step: usize, step_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step,
            step_type: step_type.into(),
            outcome: StepOutcome::Error {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StepOutcome::Success { .. })
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            StepOutcome::Success { result } => Some(result),
            StepOutcome::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Success { .. } => None,
            StepOutcome::Error { error } => Some(error),
        }
    }
}

/// 一次工作流执行的记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub current_step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    pub fn start(execution_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Running,
            start_time: Utc::now(),
            current_step: 0,
            end_time: None,
            results: Vec::new(),
            error: None,
        }
    }

    pub fn complete(&mut self, results: Vec<StepResult>) {
        self.status = ExecutionStatus::Completed;
        self.end_time = Some(Utc::now());
        self.results = results;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.end_time = Some(Utc::now());
        self.error = Some(error.into());
    }
}

/// `execute` 的返回值
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkflowRun {
    pub execution_id: String,
    pub results: Vec<StepResult>,
}
