use std::path::PathBuf;
use std::sync::Arc;

use chrono_tz::Tz;
use dashmap::DashMap;
use nudge_agents::{AgentRuntime, AnthropicClient, Mem0Client};
use nudge_channels::EventDedup;
use nudge_config::{AppConfig, resolve_secret};
use nudge_db::ReminderStore;
use tracing::{info, warn};

/// Shared application state accessible from all request handlers.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<ReminderStore>,
    pub agents: Arc<AgentRuntime>,
    /// Slack user id -> DM channel, learned from incoming events.
    pub slack_user_channels: DashMap<String, String>,
    pub slack_dedup: EventDedup,
    pub http: reqwest::Client,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Resolve secrets, open the store, and wire up the agent runtime.
    pub fn from_config(mut config: AppConfig) -> nudge_common::Result<Self> {
        // Credentials resolve config-first, then environment.
        config.anthropic.api_key = resolve_secret(
            config.anthropic.api_key.as_deref(),
            "ANTHROPIC_API_KEY",
        );
        if config.anthropic.model.is_none() {
            config.anthropic.model = std::env::var("CLAUDE_MODEL").ok().filter(|v| !v.is_empty());
        }
        if config.anthropic.max_tokens.is_none() {
            config.anthropic.max_tokens = std::env::var("CLAUDE_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        config.mem0.api_key = resolve_secret(config.mem0.api_key.as_deref(), "MEM0_API_KEY");
        if config.mem0.org_id.is_none() {
            config.mem0.org_id = std::env::var("MEM0_ORG_ID").ok().filter(|v| !v.is_empty());
        }
        if config.mem0.project_id.is_none() {
            config.mem0.project_id = std::env::var("MEM0_PROJECT_ID").ok().filter(|v| !v.is_empty());
        }
        config.slack.bot_token = resolve_secret(config.slack.bot_token.as_deref(), "SLACK_BOT_TOKEN");
        config.slack.signing_secret = resolve_secret(
            config.slack.signing_secret.as_deref(),
            "SLACK_SIGNING_SECRET",
        );
        config.gateway.cron_token =
            resolve_secret(config.gateway.cron_token.as_deref(), "ARCHIVE_CRON_TOKEN");

        let store = Arc::new(ReminderStore::open(&db_path(&config))?);

        let anthropic_key = match &config.anthropic.api_key {
            Some(key) => key.clone(),
            None => {
                warn!("no Anthropic API key configured; chat turns will fail until one is set");
                String::new()
            }
        };
        let llm = AnthropicClient::new(
            anthropic_key,
            config.anthropic.model.clone(),
            config.anthropic.max_tokens,
            config.anthropic.base_url.clone(),
        );

        let mem0_key = match &config.mem0.api_key {
            Some(key) => key.clone(),
            None => {
                warn!("no Mem0 API key configured; memory retrieval will be empty");
                String::new()
            }
        };
        let mem0 = Arc::new(Mem0Client::new(
            mem0_key,
            config.mem0.org_id.clone(),
            config.mem0.project_id.clone(),
            config.mem0.base_url.clone(),
            config.mem0.store_conversation,
        ));

        let timezone: Tz = match config.agent.timezone.parse() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(
                    "invalid timezone {:?}, falling back to Asia/Kolkata",
                    config.agent.timezone
                );
                chrono_tz::Asia::Kolkata
            }
        };

        let agents = Arc::new(AgentRuntime::new(
            Arc::clone(&store),
            mem0,
            llm,
            timezone,
            config.agent.conversation_window,
            config.mem0.context_ttl_seconds,
        ));

        info!("application state initialized (timezone {})", timezone.name());

        Ok(Self {
            config,
            store,
            agents,
            slack_user_channels: DashMap::new(),
            slack_dedup: EventDedup::default(),
            http: reqwest::Client::new(),
        })
    }

    pub fn slack_bot_token(&self) -> Option<&str> {
        self.config.slack.bot_token.as_deref()
    }

    pub fn slack_signing_secret(&self) -> &str {
        self.config.slack.signing_secret.as_deref().unwrap_or("")
    }
}

fn db_path(config: &AppConfig) -> PathBuf {
    if let Ok(path) = std::env::var("DB_PATH")
        && !path.is_empty()
    {
        return PathBuf::from(path);
    }

    let data_dir = config
        .data_dir
        .clone()
        .or_else(|| dirs::home_dir().map(|h| h.join(".nudge").join("data")))
        .unwrap_or_else(|| PathBuf::from(".nudge/data"));

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        warn!("failed to create data directory: {e}");
    }

    data_dir.join("data.db")
}
