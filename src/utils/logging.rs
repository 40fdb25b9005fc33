use std::env;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::env::ENV_DEBUG;

/// 日志配置
pub struct LoggingConfig;

impl LoggingConfig {
    /// 初始化日志系统
    ///
    /// 支持通过环境变量配置：
    /// - RUST_LOG: 设置日志级别（error, warn, info, debug, trace）
    /// - STEPFLOW_DEBUG: 启用详细调试输出（文件、行号、线程）
    ///
    /// 使用示例：
    /// ```no_run
    /// use stepflow::utils::LoggingConfig;
    ///
    /// fn main() {
    ///     LoggingConfig::init();
    ///     tracing::info!("engine ready");
    /// }
    /// ```
    pub fn init() {
        let is_debug = Self::is_debug();

        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => {
                if is_debug {
                    EnvFilter::new("stepflow=debug,info")
                } else {
                    EnvFilter::new("stepflow=info,warn")
                }
            }
        };

        let fmt_layer = fmt::layer()
            .with_target(is_debug)
            .with_file(is_debug)
            .with_line_number(is_debug)
            .with_thread_ids(is_debug);

        // 测试或重复初始化时已有全局 subscriber，忽略即可
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();

        if is_debug {
            tracing::debug!("debug logging enabled");
        }
    }

    /// 初始化日志系统（带自定义过滤器）
    pub fn init_with_filter(filter: &str) {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new(filter))
            .with(fmt::layer())
            .try_init();
    }

    /// 检查是否启用调试模式
    pub fn is_debug() -> bool {
        env::var(ENV_DEBUG).is_ok()
    }
}

/// 便捷宏：记录带上下文的错误
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {
        tracing::error!(error = ?$err, "error occurred")
    };
    ($err:expr, $($key:tt = $value:expr),+) => {
        tracing::error!(error = ?$err, $($key = $value),+)
    };
}

/// 便捷宏：记录带上下文的警告
#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        tracing::warn!($msg)
    };
    ($msg:expr, $($key:tt = $value:expr),+) => {
        tracing::warn!($($key = $value),+, $msg)
    };
}
