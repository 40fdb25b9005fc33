use serde_json::{Map, Value};

pub const KEY_WORKFLOW: &str = "workflow";
pub const KEY_TRIGGER: &str = "trigger";
pub const KEY_EXECUTION_ID: &str = "execution_id";

/// 单次执行独享的上下文，供占位符解析使用
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionContext {
    values: Map<String, Value>,
}

impl ExecutionContext {
    /// 初始化上下文：先写入 `workflow`/`trigger`/`execution_id`，再平铺触发载荷（载荷同名键覆盖）
    pub fn seed(workflow_name: &str, payload: &Map<String, Value>, execution_id: &str) -> Self {
        let mut values = Map::new();
        values.insert(KEY_WORKFLOW.into(), Value::String(workflow_name.to_string()));
        values.insert(KEY_TRIGGER.into(), Value::Object(payload.clone()));
        values.insert(KEY_EXECUTION_ID.into(), Value::String(execution_id.to_string()));
        for (key, value) in payload {
            values.insert(key.clone(), value.clone());
        }
        Self { values }
    }

    pub fn step_result_key(position: usize) -> String {
        format!("step_{position}_result")
    }

    /// 记录第 `position` 步（从 1 开始）的结果
    pub fn record_step_result(&mut self, position: usize, result: Value) {
        self.values.insert(Self::step_result_key(position), result);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}
