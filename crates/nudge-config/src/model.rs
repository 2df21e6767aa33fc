use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub mem0: Mem0Config,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            anthropic: AnthropicConfig::default(),
            mem0: Mem0Config::default(),
            slack: SlackConfig::default(),
            agent: AgentConfig::default(),
            data_dir: None,
            log_level: Some("info".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for the `x-cron-token` header on cron routes.
    #[serde(default)]
    pub cron_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cron_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mem0Config {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub org_id: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Whether conversation turns are mirrored into Mem0.
    #[serde(default = "default_true")]
    pub store_conversation: bool,

    /// TTL for the cached per-user memory context.
    #[serde(default = "default_context_ttl")]
    pub context_ttl_seconds: i64,
}

impl Default for Mem0Config {
    fn default() -> Self {
        Self {
            api_key: None,
            org_id: None,
            project_id: None,
            base_url: None,
            store_conversation: default_true(),
            context_ttl_seconds: default_context_ttl(),
        }
    }
}

fn default_context_ttl() -> i64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub signing_secret: Option<String>,

    #[serde(default = "default_true")]
    pub notify_enabled: bool,

    #[serde(default = "default_notify_interval")]
    pub notify_interval_seconds: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            signing_secret: None,
            notify_enabled: default_true(),
            notify_interval_seconds: default_notify_interval(),
        }
    }
}

fn default_notify_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// IANA timezone used for parsing and rendering due times.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// How many recent conversation messages are replayed into the prompt.
    #[serde(default = "default_convo_window")]
    pub conversation_window: usize,

    /// Lead time for "due soon" notification queries.
    #[serde(default = "default_lead_time")]
    pub notify_lead_seconds: i64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            conversation_window: default_convo_window(),
            notify_lead_seconds: default_lead_time(),
        }
    }
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

fn default_convo_window() -> usize {
    6
}

fn default_lead_time() -> i64 {
    600
}

fn default_true() -> bool {
    true
}
