//! `{{path.to.value}}` 占位符解析

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StepflowError};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("token pattern is valid"));

/// 占位符缺失时的处理方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenMode {
    /// 路径缺失时替换为空字符串
    #[default]
    Lenient,
    /// 路径缺失时返回 `UnresolvedToken`
    Strict,
}

/// 使用上下文解析配置中的占位符（宽松模式）
///
/// 只处理字符串值，其余值原样保留；不修改 `config` 与 `context`。
pub fn resolve(config: &Map<String, Value>, context: &Map<String, Value>) -> Map<String, Value> {
    config
        .iter()
        .map(|(key, value)| {
            let resolved = match value {
                Value::String(text) => Value::String(render_lenient(text, context)),
                other => other.clone(),
            };
            (key.clone(), resolved)
        })
        .collect()
}

/// 按指定模式解析配置
pub fn resolve_with_mode(
    config: &Map<String, Value>,
    context: &Map<String, Value>,
    mode: TokenMode,
) -> Result<Map<String, Value>> {
    match mode {
        TokenMode::Lenient => Ok(resolve(config, context)),
        TokenMode::Strict => {
            let mut resolved = Map::with_capacity(config.len());
            for (key, value) in config {
                let value = match value {
                    Value::String(text) => Value::String(render_strict(text, context)?),
                    other => other.clone(),
                };
                resolved.insert(key.clone(), value);
            }
            Ok(resolved)
        }
    }
}

/// 解析单个字符串
pub fn render(text: &str, context: &Map<String, Value>, mode: TokenMode) -> Result<String> {
    match mode {
        TokenMode::Lenient => Ok(render_lenient(text, context)),
        TokenMode::Strict => render_strict(text, context),
    }
}

/// 列出字符串中出现的全部占位符路径（已去除首尾空白）
pub fn tokens(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// 沿 `.` 分隔的路径在上下文中查找值，数组支持数字下标
pub fn lookup<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.trim().split('.');
    let first = segments.next()?;
    let mut current = context.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// 值的文本形式：字符串原样输出，其它值输出紧凑 JSON
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn render_lenient(text: &str, context: &Map<String, Value>) -> String {
    TOKEN_PATTERN
        .replace_all(text, |caps: &Captures| {
            lookup(context, &caps[1]).map(stringify).unwrap_or_default()
        })
        .into_owned()
}

fn render_strict(text: &str, context: &Map<String, Value>) -> Result<String> {
    let mut missing: Option<String> = None;
    let rendered = TOKEN_PATTERN.replace_all(text, |caps: &Captures| {
        match lookup(context, &caps[1]) {
            Some(value) => stringify(value),
            None => {
                missing.get_or_insert_with(|| caps[1].trim().to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(path) => Err(StepflowError::UnresolvedToken(path)),
        None => Ok(rendered.into_owned()),
    }
}
