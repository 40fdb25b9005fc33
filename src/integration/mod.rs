pub mod builtin;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Result, StepflowError};

/// 集成动作处理器
///
/// 接收解析后的步骤配置，返回步骤结果；返回 `Err` 表示该步骤失败。
/// 重试策略由处理器自行决定，注册表不做重试。
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(&self, config: Map<String, Value>) -> Result<Value>;
}

/// 闭包形式的动作处理器
pub struct FnAction<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> ActionHandler for FnAction<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn call(&self, config: Map<String, Value>) -> Result<Value> {
        (self.func)(config).await
    }
}

/// 将异步闭包包装为 `ActionHandler`
pub fn action_fn<F, Fut>(func: F) -> Arc<dyn ActionHandler>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(FnAction { func })
}

/// 一个集成及其全部动作
pub struct Integration {
    name: String,
    actions: HashMap<String, Arc<dyn ActionHandler>>,
}

impl Integration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: HashMap::new(),
        }
    }

    pub fn with_action(mut self, key: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.register_action(key, handler);
        self
    }

    pub fn register_action(&mut self, key: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.actions.insert(key.into(), handler);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self, key: &str) -> Option<Arc<dyn ActionHandler>> {
        self.actions.get(key).map(Arc::clone)
    }

    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// 集成动作注册表，启动时一次性构建
#[derive(Default)]
pub struct IntegrationRegistry {
    integrations: HashMap<String, Arc<Integration>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self {
            integrations: HashMap::new(),
        }
    }

    /// 注册集成，同名集成会被替换
    pub fn register(&mut self, integration: Integration) {
        self.integrations
            .insert(integration.name().to_string(), Arc::new(integration));
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.register(integration);
        self
    }

    pub fn get_integration(&self, name: &str) -> Option<Arc<Integration>> {
        self.integrations.get(name).map(Arc::clone)
    }

    /// 查找动作处理器，缺失时返回对应的步骤错误
    pub fn resolve_action(&self, integration: &str, action: &str) -> Result<Arc<dyn ActionHandler>> {
        let entry = self
            .get_integration(integration)
            .ok_or_else(|| StepflowError::IntegrationNotRegistered(integration.to_string()))?;
        entry
            .action(action)
            .ok_or_else(|| StepflowError::ActionNotRegistered {
                integration: integration.to_string(),
                action: action.to_string(),
            })
    }

    pub fn integration_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.integrations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
