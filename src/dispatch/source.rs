use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::workflow::Workflow;

/// 工作流来源（通常由数据库实现）
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    async fn get(&self, workflow_id: &str) -> Result<Option<Workflow>>;
    /// 查找组织下与触发签名匹配的 active 工作流
    async fn find_active(
        &self,
        organization: &str,
        source: &str,
        trigger_type: &str,
    ) -> Result<Vec<Workflow>>;
}

/// 内存实现，保持插入顺序
#[derive(Default)]
pub struct MemoryWorkflowSource {
    workflows: RwLock<Vec<Workflow>>,
}

impl MemoryWorkflowSource {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(Vec::new()),
        }
    }

    /// 插入工作流，同 ID 的已有定义会被替换
    pub fn upsert(&self, workflow: Workflow) {
        let mut workflows = self.workflows.write();
        match workflows.iter_mut().find(|existing| existing.id == workflow.id) {
            Some(existing) => *existing = workflow,
            None => workflows.push(workflow),
        }
    }

    pub fn with_workflow(self, workflow: Workflow) -> Self {
        self.upsert(workflow);
        self
    }

    pub fn remove(&self, workflow_id: &str) -> Option<Workflow> {
        let mut workflows = self.workflows.write();
        let position = workflows.iter().position(|workflow| workflow.id == workflow_id)?;
        Some(workflows.remove(position))
    }

    pub fn len(&self) -> usize {
        self.workflows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WorkflowSource for MemoryWorkflowSource {
    async fn get(&self, workflow_id: &str) -> Result<Option<Workflow>> {
        Ok(self
            .workflows
            .read()
            .iter()
            .find(|workflow| workflow.id == workflow_id)
            .cloned())
    }

    async fn find_active(
        &self,
        organization: &str,
        source: &str,
        trigger_type: &str,
    ) -> Result<Vec<Workflow>> {
        Ok(self
            .workflows
            .read()
            .iter()
            .filter(|workflow| {
                workflow.organization == organization
                    && workflow.is_active()
                    && workflow.trigger.matches(source, trigger_type)
            })
            .cloned()
            .collect())
    }
}
