use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::integration::builtin::debug_integration;
use crate::integration::IntegrationRegistry;
use crate::runtime::{StepResult, WorkflowExecutor};
use crate::template::TokenMode;
use crate::workflow::{load_workflow_from_file, payload_from_value, Workflow};
use crate::EngineConfig;

/// `run` 子命令的输出
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub workflow_id: String,
    pub execution_id: String,
    pub results: Vec<StepResult>,
}

/// CLI 使用的注册表：仅包含调试集成
pub fn cli_registry() -> IntegrationRegistry {
    IntegrationRegistry::new().with_integration(debug_integration())
}

/// 读取触发载荷文件，未提供时为空对象
pub fn load_payload(path: Option<&Path>) -> Result<Map<String, Value>> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            let value: Value = serde_json::from_str(&content)?;
            payload_from_value(value)
        }
        None => Ok(Map::new()),
    }
}

/// 加载工作流与载荷并执行一次
pub async fn run_workflow_file(
    workflow_path: &Path,
    payload_path: Option<&Path>,
    strict: bool,
) -> Result<RunReport> {
    let workflow: Workflow = load_workflow_from_file(workflow_path)?;
    let payload = load_payload(payload_path)?;

    let mut config = EngineConfig::from_env()?;
    if strict {
        config.token_mode = TokenMode::Strict;
    }
    let executor = WorkflowExecutor::with_config(cli_registry(), config);
    let run = executor.execute(&workflow, payload).await?;

    Ok(RunReport {
        workflow_id: workflow.id,
        execution_id: run.execution_id,
        results: run.results,
    })
}
