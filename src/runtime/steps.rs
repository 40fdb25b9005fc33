use serde_json::{json, Map, Value};
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::config::{EngineConfig, WebhookConfig};
use crate::error::{Result, StepflowError};
use crate::template::stringify;
use crate::workflow::StepKind;

pub const DEFAULT_LOG_MESSAGE: &str = "Log step executed";

/// 内置步骤：delay / log / webhook
#[derive(Clone)]
pub struct BuiltinSteps {
    default_delay_ms: u64,
    webhook: WebhookConfig,
    #[cfg(feature = "webhook-client")]
    client: reqwest::Client,
}

impl BuiltinSteps {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            default_delay_ms: config.default_delay_ms,
            webhook: config.webhook.clone(),
            #[cfg(feature = "webhook-client")]
            client: reqwest::Client::new(),
        }
    }

    pub async fn run(&self, kind: &StepKind, config: Map<String, Value>) -> Result<Value> {
        match kind {
            StepKind::Delay => self.delay(&config).await,
            StepKind::Log => Ok(self.log(&config)),
            StepKind::Webhook => self.webhook(config).await,
            StepKind::Other(step_type) => Err(StepflowError::UnknownStepType(step_type.clone())),
        }
    }

    async fn delay(&self, config: &Map<String, Value>) -> Result<Value> {
        let millis = delay_millis(config.get("delay"), self.default_delay_ms);
        debug!(delay_ms = millis, "delay step sleeping");
        sleep(Duration::from_millis(millis)).await;
        Ok(json!({ "delayed": millis }))
    }

    fn log(&self, config: &Map<String, Value>) -> Value {
        let message = match config.get("message") {
            None | Some(Value::Null) => String::new(),
            Some(value) => stringify(value),
        };
        let message = if message.is_empty() {
            DEFAULT_LOG_MESSAGE.to_string()
        } else {
            message
        };
        info!(message = %message, "workflow log step");
        json!({ "logged": message })
    }

    async fn webhook(&self, config: Map<String, Value>) -> Result<Value> {
        let url = config
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| StepflowError::StepConfig("webhook step requires a `url`".into()))?;

        if self.webhook.deliver {
            return self.deliver(url, config).await;
        }
        debug!(url = %url, "webhook delivery disabled, recording target only");
        Ok(json!({ "webhook_sent": url }))
    }

    #[cfg(feature = "webhook-client")]
    async fn deliver(&self, url: String, mut config: Map<String, Value>) -> Result<Value> {
        let body = match config.remove("body") {
            Some(body) => body,
            None => Value::Object(config),
        };
        let response = self
            .client
            .post(&url)
            .timeout(self.webhook.timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| StepflowError::Action(format!("webhook request to `{url}` failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StepflowError::Action(format!(
                "webhook `{url}` responded with {status}"
            )));
        }
        info!(url = %url, status = status.as_u16(), "webhook delivered");
        Ok(json!({ "webhook_sent": url, "status": status.as_u16() }))
    }

    #[cfg(not(feature = "webhook-client"))]
    async fn deliver(&self, url: String, _config: Map<String, Value>) -> Result<Value> {
        tracing::warn!(
            url = %url,
            timeout_ms = self.webhook.timeout_ms,
            "webhook delivery requested but the `webhook-client` feature is disabled"
        );
        Ok(json!({ "webhook_sent": url }))
    }
}

/// `config.delay` 转毫秒：数字或数字字符串，负数按 0 处理，无法解析时取默认值
pub fn delay_millis(value: Option<&Value>, default_ms: u64) -> u64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(ms) if ms.is_finite() => ms.max(0.0).floor() as u64,
        _ => default_ms,
    }
}
