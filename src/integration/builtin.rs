use serde_json::Value;

use super::{action_fn, Integration};
use crate::error::StepflowError;

pub const DEBUG_INTEGRATION: &str = "debug";

/// 调试集成：`echo` 动作原样返回解析后的配置，`fail` 动作总是失败
pub fn debug_integration() -> Integration {
    Integration::new(DEBUG_INTEGRATION)
        .with_action(
            "echo",
            action_fn(|config| async move { Ok::<_, StepflowError>(Value::Object(config)) }),
        )
        .with_action(
            "fail",
            action_fn(|config| async move {
                let reason = config
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("debug failure")
                    .to_string();
                Err::<Value, _>(StepflowError::Action(reason))
            }),
        )
}
