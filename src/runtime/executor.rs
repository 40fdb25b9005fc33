use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::error::{Result, StepflowError};
use crate::integration::IntegrationRegistry;
use crate::state::{ExecutionStore, MemoryStore};
use crate::template;
use crate::workflow::{Step, Workflow};

use super::context::ExecutionContext;
use super::steps::BuiltinSteps;
use super::types::{ExecutionRecord, ExecutionStatus, StepResult, WorkflowRun};

static NEXT_EXECUTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// 生成执行 ID：工作流 ID + 启动时间戳 + 进程内序号
pub fn next_execution_id(workflow_id: &str) -> String {
    let seq = NEXT_EXECUTION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", workflow_id, Utc::now().timestamp_millis(), seq)
}

/// 工作流执行器
///
/// 步骤按数组顺序串行执行；单步失败记录为 `error` 并停止后续步骤，
/// 执行整体仍为 `completed`。只有步骤边界之外的内部错误会把执行标记为
/// `failed` 并返回 `Err`。
#[derive(Clone)]
pub struct WorkflowExecutor {
    integrations: Arc<IntegrationRegistry>,
    store: Arc<dyn ExecutionStore>,
    config: Arc<EngineConfig>,
    builtin: BuiltinSteps,
}

impl WorkflowExecutor {
    pub fn new(integrations: IntegrationRegistry) -> Self {
        Self::with_config(integrations, EngineConfig::default())
    }

    /// 按配置构建执行器，内存存储容量取 `store_capacity`
    pub fn with_config(integrations: IntegrationRegistry, config: EngineConfig) -> Self {
        let store: Arc<dyn ExecutionStore> = match config.store_capacity {
            Some(capacity) => Arc::new(MemoryStore::with_capacity(capacity)),
            None => Arc::new(MemoryStore::unbounded()),
        };
        Self {
            integrations: Arc::new(integrations),
            store,
            builtin: BuiltinSteps::new(&config),
            config: Arc::new(config),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn integrations(&self) -> &IntegrationRegistry {
        &self.integrations
    }

    /// 执行工作流，返回各步骤结果
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
        trigger_payload: Map<String, Value>,
    ) -> Result<Vec<StepResult>> {
        self.execute(workflow, trigger_payload)
            .await
            .map(|run| run.results)
    }

    /// 执行工作流，同时返回执行 ID
    pub async fn execute(
        &self,
        workflow: &Workflow,
        trigger_payload: Map<String, Value>,
    ) -> Result<WorkflowRun> {
        self.execute_tracked(workflow, trigger_payload).await.1
    }

    /// 与 `execute` 相同，但失败时也返回已分配的执行 ID，便于查询 `failed` 记录
    pub async fn execute_tracked(
        &self,
        workflow: &Workflow,
        trigger_payload: Map<String, Value>,
    ) -> (String, Result<WorkflowRun>) {
        let execution_id = next_execution_id(&workflow.id);
        let span = info_span!(
            "workflow_execution",
            execution_id = %execution_id,
            workflow_id = %workflow.id,
        );
        let result = self
            .run(workflow, trigger_payload, execution_id.clone())
            .instrument(span)
            .await;
        (execution_id, result)
    }

    /// 按执行 ID 查询执行记录
    pub async fn execution_status(&self, execution_id: &str) -> Result<Option<ExecutionRecord>> {
        self.store.get(execution_id).await
    }

    /// 全部被跟踪的执行记录（按插入顺序的快照）
    pub async fn all_running_workflows(&self) -> Result<Vec<ExecutionRecord>> {
        self.store.list().await
    }

    pub async fn executions_with_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<ExecutionRecord>> {
        let records = self.store.list().await?;
        Ok(records
            .into_iter()
            .filter(|record| record.status == status)
            .collect())
    }

    async fn run(
        &self,
        workflow: &Workflow,
        trigger_payload: Map<String, Value>,
        execution_id: String,
    ) -> Result<WorkflowRun> {
        let mut record = ExecutionRecord::start(&execution_id, &workflow.id);
        self.store.put(record.clone()).await?;
        info!(workflow = %workflow.name, steps = workflow.steps.len(), "workflow execution started");

        match self
            .run_steps(workflow, &trigger_payload, &execution_id, &mut record)
            .await
        {
            Ok(results) => {
                let halted = results.iter().any(|result| !result.is_success());
                record.complete(results.clone());
                self.store.put(record).await?;
                info!(
                    executed = results.len(),
                    halted,
                    "workflow execution completed"
                );
                Ok(WorkflowRun {
                    execution_id,
                    results,
                })
            }
            Err(err) => {
                error!(error = %err, "workflow execution failed");
                record.fail(err.to_string());
                if let Err(store_err) = self.store.put(record).await {
                    crate::log_warn!(
                        "failed to persist failed execution record",
                        error = store_err.to_string()
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_steps(
        &self,
        workflow: &Workflow,
        trigger_payload: &Map<String, Value>,
        execution_id: &str,
        record: &mut ExecutionRecord,
    ) -> Result<Vec<StepResult>> {
        if workflow.steps.is_empty() {
            return Err(StepflowError::EmptyWorkflow(workflow.id.clone()));
        }

        let mut context = ExecutionContext::seed(&workflow.name, trigger_payload, execution_id);
        let mut results = Vec::with_capacity(workflow.steps.len());

        for (index, step) in workflow.steps.iter().enumerate() {
            record.current_step = index;
            self.store.put(record.clone()).await?;

            let position = index + 1;
            debug!(step = position, step_type = %step.step_type, "running step");

            let outcome = AssertUnwindSafe(self.run_step(step, &context))
                .catch_unwind()
                .await
                .map_err(|panic| StepflowError::HandlerPanicked(panic_message(panic)))?;

            match outcome {
                Ok(result) => {
                    context.record_step_result(position, result.clone());
                    results.push(StepResult::success(position, &step.step_type, result));
                }
                Err(err) => {
                    warn!(
                        step = position,
                        step_type = %step.step_type,
                        error = %err,
                        "step failed, halting workflow"
                    );
                    results.push(StepResult::error(position, &step.step_type, err.to_string()));
                    break;
                }
            }
        }

        Ok(results)
    }

    async fn run_step(&self, step: &Step, context: &ExecutionContext) -> Result<Value> {
        let config =
            template::resolve_with_mode(&step.config, context.values(), self.config.token_mode)?;

        match step.integration_action() {
            Some((integration, action)) => {
                let handler = self.integrations.resolve_action(integration, action)?;
                debug!(integration, action, "invoking integration action");
                handler.call(config).await
            }
            None => self.builtin.run(&step.kind(), config).await,
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
