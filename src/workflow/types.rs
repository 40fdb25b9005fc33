use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 工作流状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Active,
    Inactive,
}

/// 触发器描述：事件来源 + 事件类型
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerDescriptor {
    pub source: String,
    #[serde(rename = "type")]
    pub trigger_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl TriggerDescriptor {
    pub fn new(source: impl Into<String>, trigger_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            trigger_type: trigger_type.into(),
            config: None,
        }
    }

    pub fn matches(&self, source: &str, trigger_type: &str) -> bool {
        self.source == source && self.trigger_type == trigger_type
    }
}

/// 内置步骤类型
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepKind {
    Delay,
    Log,
    Webhook,
    Other(String),
}

impl StepKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "delay" => StepKind::Delay,
            "log" => StepKind::Log,
            "webhook" => StepKind::Webhook,
            other => StepKind::Other(other.to_string()),
        }
    }
}

/// 工作流步骤
///
/// `order` 仅作为展示信息，执行顺序始终以数组顺序为准。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub order: u32,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Step {
    pub fn new(order: u32, step_type: impl Into<String>) -> Self {
        Self {
            order,
            step_type: step_type.into(),
            integration: None,
            action: None,
            config: Map::new(),
        }
    }

    /// 集成动作步骤，`type` 取 `<integration>.<action>`
    pub fn integration(
        order: u32,
        integration: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        let integration = integration.into();
        let action = action.into();
        Self {
            order,
            step_type: format!("{integration}.{action}"),
            integration: Some(integration),
            action: Some(action),
            config: Map::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> StepKind {
        StepKind::parse(&self.step_type)
    }

    /// 同时设置了 integration 与 action 时返回二者
    pub fn integration_action(&self) -> Option<(&str, &str)> {
        match (self.integration.as_deref(), self.action.as_deref()) {
            (Some(integration), Some(action)) => Some((integration, action)),
            _ => None,
        }
    }
}

/// 工作流定义
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "orgId", alias = "organization_id")]
    pub organization: String,
    pub name: String,
    pub trigger: TriggerDescriptor,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub status: WorkflowStatus,
}

impl Workflow {
    pub fn new(
        id: impl Into<String>,
        organization: impl Into<String>,
        name: impl Into<String>,
        trigger: TriggerDescriptor,
    ) -> Self {
        Self {
            id: id.into(),
            organization: organization.into(),
            name: name.into(),
            trigger,
            steps: Vec::new(),
            status: WorkflowStatus::Active,
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == WorkflowStatus::Active
    }
}
