use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, StepflowError};
use crate::utils::validation::WorkflowValidator;

use super::types::Workflow;

/// 从 JSON 字符串加载并校验工作流
pub fn load_workflow_from_str(content: &str) -> Result<Workflow> {
    let value: Value = serde_json::from_str(content)?;
    load_workflow_from_value(value)
}

/// 从 JSON 值加载并校验工作流
pub fn load_workflow_from_value(value: Value) -> Result<Workflow> {
    let workflow: Workflow = serde_json::from_value(value)
        .map_err(|e| StepflowError::InvalidWorkflow(e.to_string()))?;
    WorkflowValidator::validate_workflow(&workflow)?;
    Ok(workflow)
}

/// 从文件加载并校验工作流
pub fn load_workflow_from_file(path: impl AsRef<Path>) -> Result<Workflow> {
    let content = fs::read_to_string(path.as_ref())?;
    load_workflow_from_str(&content)
}

/// 触发载荷必须是 JSON 对象
pub fn payload_from_value(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(StepflowError::InvalidWorkflow(format!(
            "trigger payload must be a JSON object, got `{other}`"
        ))),
    }
}
