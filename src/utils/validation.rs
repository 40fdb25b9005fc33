use std::collections::HashSet;

use serde_json::Value;

use crate::error::{Result, StepflowError};
use crate::template;
use crate::workflow::{Step, Workflow};

/// 工作流定义校验器
pub struct WorkflowValidator;

impl WorkflowValidator {
    /// 完整校验工作流定义
    pub fn validate_workflow(workflow: &Workflow) -> Result<()> {
        Self::validate_workflow_name(&workflow.name)?;
        if workflow.id.trim().is_empty() {
            return Err(invalid("workflow id must not be empty"));
        }
        let trigger = &workflow.trigger;
        if trigger.source.trim().is_empty() || trigger.trigger_type.trim().is_empty() {
            return Err(invalid("trigger requires both `source` and `type`"));
        }
        if workflow.steps.is_empty() {
            return Err(StepflowError::EmptyWorkflow(workflow.id.clone()));
        }

        let mut orders = HashSet::new();
        for (index, step) in workflow.steps.iter().enumerate() {
            Self::validate_step(index + 1, step)?;
            if !orders.insert(step.order) {
                return Err(invalid(format!(
                    "step {} reuses order {}",
                    index + 1,
                    step.order
                )));
            }
        }
        Ok(())
    }

    /// 验证工作流名称
    pub fn validate_workflow_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(invalid("workflow name must not be empty"));
        }
        if name.len() > 100 {
            return Err(invalid("workflow name is longer than 100 characters"));
        }
        Ok(())
    }

    /// 验证单个步骤，`position` 从 1 开始
    pub fn validate_step(position: usize, step: &Step) -> Result<()> {
        if step.order == 0 {
            return Err(invalid(format!("step {position} must have a positive `order`")));
        }
        if step.step_type.trim().is_empty() {
            return Err(invalid(format!("step {position} is missing `type`")));
        }
        if step.action.is_some() && step.integration.is_none() {
            return Err(invalid(format!(
                "step {position} sets `action` without `integration`"
            )));
        }
        for (key, value) in &step.config {
            if let Value::String(text) = value {
                Self::validate_placeholders(text).map_err(|reason| {
                    invalid(format!("step {position} config `{key}`: {reason}"))
                })?;
            }
        }
        Ok(())
    }

    /// 检查占位符是否成对闭合且路径非空
    pub fn validate_placeholders(text: &str) -> std::result::Result<(), String> {
        if text.matches("{{").count() != text.matches("}}").count() {
            return Err("unbalanced `{{ }}` placeholder".to_string());
        }
        for path in template::tokens(text) {
            if path.is_empty() {
                return Err("empty `{{}}` placeholder".to_string());
            }
            if path.split('.').any(|segment| segment.trim().is_empty()) {
                return Err(format!("malformed placeholder path `{path}`"));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> StepflowError {
    StepflowError::InvalidWorkflow(message.into())
}
