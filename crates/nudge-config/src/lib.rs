pub mod loader;
pub mod model;

pub use loader::{ConfigLoader, resolve_secret};
pub use model::{
    AgentConfig, AnthropicConfig, AppConfig, GatewayConfig, Mem0Config, SlackConfig,
};
