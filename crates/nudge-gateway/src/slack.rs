use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use nudge_channels::slack::{api as slack_api, fmt, signature};

use crate::notify;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct NotifyDueQuery {
    pub user_id: Option<String>,
}

fn verified(state: &SharedState, headers: &HeaderMap, body: &[u8]) -> bool {
    let timestamp = headers
        .get("x-slack-request-timestamp")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let provided = headers
        .get("x-slack-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    signature::verify(state.slack_signing_secret(), timestamp, body, provided)
}

fn invalid_signature() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "invalid_signature" })),
    )
}

fn parse_form(body: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// POST /slack/events — Events API callback.
pub async fn events(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if !verified(&state, &headers, &body) {
        return invalid_signature();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_payload" })),
            );
        }
    };

    if payload.get("type").and_then(|t| t.as_str()) == Some("url_verification") {
        return (
            StatusCode::OK,
            Json(json!({ "challenge": payload.get("challenge") })),
        );
    }

    if payload.get("type").and_then(|t| t.as_str()) == Some("event_callback") {
        let event_id = payload.get("event_id").and_then(|v| v.as_str()).unwrap_or("");
        if state.slack_dedup.is_duplicate(event_id) {
            return (StatusCode::OK, Json(json!({ "ok": true })));
        }

        let event = payload.get("event").cloned().unwrap_or(Value::Null);
        let is_user_message = event.get("type").and_then(|t| t.as_str()) == Some("message")
            && event.get("bot_id").is_none();

        if is_user_message {
            let user_id = event
                .get("user")
                .and_then(|v| v.as_str())
                .unwrap_or("default_user")
                .to_string();
            let channel = event
                .get("channel")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let text = fmt::sanitize_text(event.get("text").and_then(|v| v.as_str()).unwrap_or(""));

            if !user_id.is_empty() && !channel.is_empty() {
                state.slack_user_channels.insert(user_id.clone(), channel.clone());
            }

            if !text.is_empty() && !channel.is_empty() {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    handle_message(state, user_id, channel, text).await;
                });
            }
        }
    }

    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn handle_message(state: SharedState, user_id: String, channel: String, text: String) {
    let response_text = match state.agents.handle_turn(&user_id, &text).await {
        Ok(outcome) => outcome.response,
        Err(e) => {
            warn!("slack turn failed for {user_id}: {e}");
            return;
        }
    };

    let Some(bot_token) = state.slack_bot_token() else {
        warn!("slack reply skipped: missing bot token");
        return;
    };

    match slack_api::post_message(&state.http, bot_token, &channel, &response_text, None).await {
        Ok(ts) => info!("slack reply posted to {channel} (ts {ts})"),
        Err(e) => warn!("slack reply failed: {e}"),
    }
}

/// POST /slack/commands — slash command entry point.
pub async fn commands(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if !verified(&state, &headers, &body) {
        return invalid_signature();
    }

    let form = parse_form(&body);
    let user_id = form_value(&form, "user_id").unwrap_or("default_user").to_string();
    let text = form_value(&form, "text").unwrap_or("").to_string();

    match state.agents.handle_turn(&user_id, &text).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "response_type": "in_channel",
                "text": outcome.response,
            })),
        ),
        Err(e) => {
            warn!("slash command failed for {user_id}: {e}");
            (
                StatusCode::OK,
                Json(json!({
                    "response_type": "ephemeral",
                    "text": "Something went wrong",
                })),
            )
        }
    }
}

/// POST /slack/interactions — Block Kit button actions.
pub async fn interactions(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if !verified(&state, &headers, &body) {
        return invalid_signature();
    }

    let form = parse_form(&body);
    let payload: Value = form_value(&form, "payload")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Null);

    let user_id = payload
        .get("user")
        .and_then(|u| u.get("id"))
        .and_then(|v| v.as_str())
        .unwrap_or("default_user")
        .to_string();
    let response_url = payload
        .get("response_url")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let Some(action) = payload
        .get("actions")
        .and_then(|a| a.as_array())
        .and_then(|a| a.first())
        .cloned()
    else {
        return (StatusCode::OK, Json(json!({ "ok": true })));
    };

    let action_id = action
        .get("action_id")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let reminder_id = action
        .get("value")
        .and_then(|v| v.as_str())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);

    let state_for_task = Arc::clone(&state);
    tokio::spawn(async move {
        let message = match (reminder_id, action_id.as_str()) {
            (id, "reminder_done") if id > 0 => {
                let (result, _) = state_for_task.agents.action_mark_done(&user_id, id).await;
                result
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Marked as done.")
                    .to_string()
            }
            (id, "reminder_snooze_10m") if id > 0 => {
                let (result, _) = state_for_task
                    .agents
                    .action_snooze(&user_id, id, "10 minutes")
                    .await;
                result
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Snoozed for 10 minutes.")
                    .to_string()
            }
            _ => "Action not recognized.".to_string(),
        };

        if let Some(response_url) = response_url
            && let Err(e) =
                slack_api::respond(&state_for_task.http, &response_url, &message, true).await
        {
            warn!("slack interaction reply failed: {e}");
        }
    });

    (StatusCode::OK, Json(json!({ "ok": true })))
}

/// GET /slack/notify_due — manually push due reminders to known DM channels.
pub async fn notify_due(
    State(state): State<SharedState>,
    Query(query): Query<NotifyDueQuery>,
) -> impl IntoResponse {
    if state.slack_bot_token().is_none() {
        return Json(json!({ "success": false, "error": "Slack or DB not configured" }));
    }

    let sent = notify::send_due_notifications(&state, query.user_id.as_deref()).await;
    Json(json!({ "success": true, "sent": sent }))
}
