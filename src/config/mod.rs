pub mod engine;
pub mod env;

pub use engine::{EngineConfig, WebhookConfig};
pub use env::EnvConfig;
