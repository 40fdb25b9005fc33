use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::env::{self, EnvConfig};
use crate::error::{Result, StepflowError};
use crate::state::DEFAULT_STORE_CAPACITY;
use crate::template::TokenMode;

pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_CONCURRENT_EXECUTIONS: usize = 64;
pub const DEFAULT_WEBHOOK_TIMEOUT_MS: u64 = 10_000;

/// webhook 步骤配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// 是否真正发送 HTTP 请求（需要 `webhook-client` feature）
    pub deliver: bool,
    pub timeout_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            deliver: false,
            timeout_ms: DEFAULT_WEBHOOK_TIMEOUT_MS,
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 执行引擎配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub token_mode: TokenMode,
    pub default_delay_ms: u64,
    /// `None` 表示不限制记录数
    pub store_capacity: Option<usize>,
    pub max_concurrent_executions: usize,
    pub webhook: WebhookConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_mode: TokenMode::Lenient,
            default_delay_ms: DEFAULT_DELAY_MS,
            store_capacity: Some(DEFAULT_STORE_CAPACITY),
            max_concurrent_executions: DEFAULT_MAX_CONCURRENT_EXECUTIONS,
            webhook: WebhookConfig::default(),
        }
    }
}

impl EngineConfig {
    /// 从 JSON 文件加载，缺失字段取默认值
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 在默认配置上叠加环境变量
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    pub fn merge_env(mut self) -> Result<Self> {
        if EnvConfig::get_flag(env::ENV_STRICT_TOKENS) {
            self.token_mode = TokenMode::Strict;
        }
        if let Some(delay) = EnvConfig::get_parsed::<u64>(env::ENV_DEFAULT_DELAY_MS)? {
            self.default_delay_ms = delay;
        }
        if let Some(capacity) = EnvConfig::get_parsed::<usize>(env::ENV_STORE_CAPACITY)? {
            self.store_capacity = (capacity > 0).then_some(capacity);
        }
        if let Some(limit) = EnvConfig::get_parsed::<usize>(env::ENV_MAX_CONCURRENCY)? {
            self.max_concurrent_executions = limit;
        }
        if EnvConfig::get_flag(env::ENV_WEBHOOK_DELIVER) {
            self.webhook.deliver = true;
        }
        if let Some(timeout) = EnvConfig::get_parsed::<u64>(env::ENV_WEBHOOK_TIMEOUT_MS)? {
            self.webhook.timeout_ms = timeout;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_executions == 0 {
            return Err(StepflowError::Config(
                "max_concurrent_executions must be at least 1".into(),
            ));
        }
        if self.store_capacity == Some(0) {
            return Err(StepflowError::Config(
                "store_capacity must be at least 1 (omit it for an unbounded store)".into(),
            ));
        }
        if self.webhook.timeout_ms == 0 {
            return Err(StepflowError::Config("webhook.timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn with_token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }

    pub fn with_default_delay_ms(mut self, delay_ms: u64) -> Self {
        self.default_delay_ms = delay_ms;
        self
    }
}
