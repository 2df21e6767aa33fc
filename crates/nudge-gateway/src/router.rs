use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;
use crate::{api, slack};

/// Build the main application router with all routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(api::home))
        .route("/health", get(api::health))
        .route("/chat", post(api::chat))
        .route("/action/done", post(api::action_done))
        .route("/action/snooze", post(api::action_snooze))
        .route("/notifications", get(api::notifications))
        .route("/memories", get(api::memories))
        .route("/cron/archive_overdue", post(api::archive_overdue))
        .route("/webhook/mem0", post(api::mem0_webhook))
        .route("/slack/events", post(slack::events))
        .route("/slack/commands", post(slack::commands))
        .route("/slack/interactions", post(slack::interactions))
        .route("/slack/notify_due", get(slack::notify_due))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
