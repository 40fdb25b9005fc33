/// 工具模块 - 日志初始化与工作流定义校验
pub mod logging;
pub mod validation;

pub use logging::LoggingConfig;
pub use validation::WorkflowValidator;
