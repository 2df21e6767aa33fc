use std::sync::Arc;

use nudge_common::Result;
use nudge_config::AppConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::notify;
use crate::router::build_router;
use crate::state::AppState;

/// The main gateway server that binds to a port and serves the chat API,
/// Slack endpoints, and cron hooks.
pub struct GatewayServer {
    config: AppConfig,
}

impl GatewayServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.gateway.host, self.config.gateway.port);

        let state = Arc::new(AppState::from_config(self.config)?);
        notify::spawn_notify_loop(&state);

        let app = build_router(state);

        let listener = TcpListener::bind(&addr).await?;
        info!("Nudge gateway listening on {}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| nudge_common::Error::Gateway(format!("server error: {e}")))?;

        Ok(())
    }
}
