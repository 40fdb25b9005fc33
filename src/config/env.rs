use crate::error::{Result, StepflowError};
use std::env;
use std::str::FromStr;

pub const ENV_DEBUG: &str = "STEPFLOW_DEBUG";
pub const ENV_STRICT_TOKENS: &str = "STEPFLOW_STRICT_TOKENS";
pub const ENV_DEFAULT_DELAY_MS: &str = "STEPFLOW_DEFAULT_DELAY_MS";
pub const ENV_STORE_CAPACITY: &str = "STEPFLOW_STORE_CAPACITY";
pub const ENV_MAX_CONCURRENCY: &str = "STEPFLOW_MAX_CONCURRENCY";
pub const ENV_WEBHOOK_DELIVER: &str = "STEPFLOW_WEBHOOK_DELIVER";
pub const ENV_WEBHOOK_TIMEOUT_MS: &str = "STEPFLOW_WEBHOOK_TIMEOUT_MS";

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 获取可选的环境变量
    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.trim().is_empty())
    }

    /// 获取并解析可选的环境变量，解析失败视为配置错误
    pub fn get_parsed<T>(key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::get_env_optional(key) {
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
                StepflowError::Config(format!("environment variable `{key}`: {e}"))
            }),
            None => Ok(None),
        }
    }

    /// 布尔开关：`1`、`true`、`yes`、`on` 视为开启
    pub fn get_flag(key: &str) -> bool {
        Self::get_env_optional(key)
            .map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
            .unwrap_or(false)
    }
}
