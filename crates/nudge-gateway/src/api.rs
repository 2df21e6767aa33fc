use axum::Json;
use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use chrono::TimeZone;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use nudge_agents::mem0;
use nudge_common::now_epoch;

use crate::state::SharedState;
use crate::web;

fn default_user() -> String {
    "default_user".to_string()
}

#[derive(Deserialize)]
pub struct ChatForm {
    pub message: String,
    #[serde(default = "default_user")]
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct DoneForm {
    pub reminder_id: i64,
    #[serde(default = "default_user")]
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct SnoozeForm {
    pub reminder_id: i64,
    pub snooze_str: String,
    #[serde(default = "default_user")]
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct UserQuery {
    #[serde(default = "default_user")]
    pub user_id: String,
}

/// GET / — the embedded chat page.
pub async fn home() -> Html<&'static str> {
    Html(web::CHAT_PAGE)
}

/// GET /health — liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// POST /chat — run one assistant turn for a web chat message.
pub async fn chat(
    State(state): State<SharedState>,
    Form(form): Form<ChatForm>,
) -> impl IntoResponse {
    let started = std::time::Instant::now();

    match state.agents.handle_turn(&form.user_id, &form.message).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": form.message,
                "response": outcome.response,
                "elapsed": started.elapsed().as_secs_f64(),
                "debug": outcome.debug,
            })),
        ),
        Err(e) => {
            warn!("chat turn failed for {}: {e}", form.user_id);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

/// POST /action/done — mark a reminder done directly from the UI.
pub async fn action_done(
    State(state): State<SharedState>,
    Form(form): Form<DoneForm>,
) -> impl IntoResponse {
    let (result, debug) = state
        .agents
        .action_mark_done(&form.user_id, form.reminder_id)
        .await;
    let success = result.get("success").and_then(|s| s.as_bool()).unwrap_or(false);
    Json(json!({ "success": success, "result": result, "debug": debug }))
}

/// POST /action/snooze — snooze a reminder directly from the UI.
pub async fn action_snooze(
    State(state): State<SharedState>,
    Form(form): Form<SnoozeForm>,
) -> impl IntoResponse {
    let (result, debug) = state
        .agents
        .action_snooze(&form.user_id, form.reminder_id, &form.snooze_str)
        .await;
    let success = result.get("success").and_then(|s| s.as_bool()).unwrap_or(false);
    Json(json!({ "success": success, "result": result, "debug": debug }))
}

/// GET /notifications — reminders due within the lead window, marked
/// notified as they are handed out.
pub async fn notifications(
    State(state): State<SharedState>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let now = now_epoch();
    let lead = state.config.agent.notify_lead_seconds;
    let tz = state.agents.timezone();

    let due_soon = match state.store.get_due_soon_reminders(&query.user_id, now, lead) {
        Ok(reminders) => reminders,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            );
        }
    };

    let mut items = Vec::new();
    for reminder in due_soon {
        let Some(due_at) = reminder.due_at_epoch else {
            continue;
        };
        let due_label = tz
            .timestamp_opt(due_at, 0)
            .single()
            .map(|dt| dt.format("%b %d %I:%M %p").to_string())
            .unwrap_or_default();
        items.push(json!({
            "reminder_id": reminder.id,
            "title": reminder.title,
            "due_at_epoch": due_at,
            "due_label": due_label,
            "minutes_left": ((due_at - now) / 60).max(0),
        }));
        if let Err(e) = state
            .store
            .mark_reminder_notified(reminder.id, &query.user_id, now)
        {
            warn!("failed to mark reminder {} notified: {e}", reminder.id);
        }
    }

    (
        StatusCode::OK,
        Json(json!({ "success": true, "notifications": items })),
    )
}

/// GET /memories — all Mem0 memories for a user, grouped by category.
pub async fn memories(
    State(state): State<SharedState>,
    Query(query): Query<UserQuery>,
) -> impl IntoResponse {
    let client = state.agents.mem0();
    let user_id = &query.user_id;

    let active = client.get_all(user_id, &[mem0::CAT_REMINDER_ACTIVE]).await;
    let archived = client.get_all(user_id, &[mem0::CAT_REMINDER_ARCHIVED]).await;
    let prefs = client.get_all(user_id, &[mem0::CAT_USER_PREFS]).await;
    let behavior = client.get_all(user_id, &[mem0::CAT_USER_BEHAVIOR]).await;
    let convo = client.get_all(user_id, &[mem0::CAT_CONVERSATION]).await;

    Json(json!({
        "success": true,
        "all_memories": {
            "active": active,
            "archived": archived,
            "preferences": prefs,
            "behavior": behavior,
            "conversation": convo,
        }
    }))
}

/// POST /cron/archive_overdue — archive active reminders whose due time
/// has passed. Guarded by the `x-cron-token` header.
pub async fn archive_overdue(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(expected) = &state.config.gateway.cron_token
        && !expected.is_empty()
    {
        let provided = headers
            .get("x-cron-token")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            );
        }
    }

    match state.store.archive_overdue_reminders(now_epoch()) {
        Ok(archived) => (
            StatusCode::OK,
            Json(json!({ "success": true, "archived": archived })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

/// POST /webhook/mem0 — record Mem0 webhook deliveries in the audit trail.
pub async fn mem0_webhook(
    State(state): State<SharedState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    let user_id = payload
        .get("user_id")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if let Err(e) = state
        .store
        .log_audit(user_id, "mem0_webhook", &payload.to_string())
    {
        warn!("failed to log mem0 webhook: {e}");
    }
    Json(json!({ "success": true }))
}
