//! 触发分发：按组织与触发签名选出 active 工作流并交给执行器

mod source;

use std::sync::Arc;

use futures::future;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::{Result, StepflowError};
use crate::runtime::{ExecutionStatus, StepResult, WorkflowExecutor, WorkflowRun};
use crate::workflow::Workflow;

pub use source::{MemoryWorkflowSource, WorkflowSource};

/// 外部事件
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(alias = "orgId")]
    pub organization: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl TriggerEvent {
    pub fn new(
        organization: impl Into<String>,
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            organization: organization.into(),
            source: source.into(),
            event_type: event_type.into(),
            payload,
        }
    }
}

/// 单个工作流的分发结果
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub workflow_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    fn completed(workflow_id: &str, run: WorkflowRun) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            execution_id: Some(run.execution_id),
            status: ExecutionStatus::Completed,
            results: run.results,
            error: None,
        }
    }

    fn failed(workflow_id: &str, execution_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            execution_id,
            status: ExecutionStatus::Failed,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// 请求层状态码：completed（无论步骤成败）为 200，failed 为 500
    pub fn http_status(&self) -> u16 {
        match self.status {
            ExecutionStatus::Completed => 200,
            ExecutionStatus::Running | ExecutionStatus::Failed => 500,
        }
    }
}

/// 触发分发器，负责并发上限
pub struct Dispatcher {
    executor: WorkflowExecutor,
    source: Arc<dyn WorkflowSource>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(executor: WorkflowExecutor, source: Arc<dyn WorkflowSource>) -> Self {
        let limit = executor.config().max_concurrent_executions.max(1);
        Self {
            executor,
            source,
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    pub fn executor(&self) -> &WorkflowExecutor {
        &self.executor
    }

    /// webhook 入口：执行所有匹配的 active 工作流
    pub async fn dispatch(&self, event: &TriggerEvent) -> Result<Vec<DispatchOutcome>> {
        let workflows = self
            .source
            .find_active(&event.organization, &event.source, &event.event_type)
            .await?;

        if workflows.is_empty() {
            debug!(
                organization = %event.organization,
                source = %event.source,
                event_type = %event.event_type,
                "no workflows matched trigger"
            );
            return Ok(Vec::new());
        }

        info!(
            organization = %event.organization,
            source = %event.source,
            event_type = %event.event_type,
            matched = workflows.len(),
            "dispatching trigger"
        );
        let runs = workflows
            .iter()
            .map(|workflow| self.run_one(workflow, event.payload.clone()));
        Ok(future::join_all(runs).await)
    }

    /// 手动触发：工作流必须属于该组织且处于 active 状态
    pub async fn trigger_manual(
        &self,
        organization: &str,
        workflow_id: &str,
        payload: Map<String, Value>,
    ) -> Result<DispatchOutcome> {
        let workflow = self
            .source
            .get(workflow_id)
            .await?
            .filter(|workflow| workflow.organization == organization)
            .ok_or_else(|| StepflowError::WorkflowNotFound(workflow_id.to_string()))?;

        if !workflow.is_active() {
            return Err(StepflowError::WorkflowInactive(workflow_id.to_string()));
        }

        info!(organization, workflow_id, "manual trigger");
        Ok(self.run_one(&workflow, payload).await)
    }

    async fn run_one(&self, workflow: &Workflow, payload: Map<String, Value>) -> DispatchOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return DispatchOutcome::failed(&workflow.id, None, "dispatcher is closed"),
        };

        let (execution_id, result) = self.executor.execute_tracked(workflow, payload).await;
        match result {
            Ok(run) => DispatchOutcome::completed(&workflow.id, run),
            Err(err) => {
                crate::log_error!(
                    err,
                    workflow_id = workflow.id.as_str(),
                    execution_id = execution_id.as_str()
                );
                DispatchOutcome::failed(&workflow.id, Some(execution_id), err.to_string())
            }
        }
    }
}
