use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Deserialize)]
struct SlackApiResponse {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
}

/// Post a message to a Slack channel, optionally with Block Kit blocks.
/// Returns the message `ts` (timestamp ID).
pub async fn post_message(
    client: &Client,
    bot_token: &str,
    channel: &str,
    text: &str,
    blocks: Option<&Value>,
) -> Result<String, String> {
    let mut payload = serde_json::json!({
        "channel": channel,
        "text": text,
    });
    if let Some(blocks) = blocks {
        payload["blocks"] = blocks.clone();
    }

    let resp = client
        .post(format!("{SLACK_API_BASE}/chat.postMessage"))
        .bearer_auth(bot_token)
        .json(&payload)
        .send()
        .await
        .map_err(|e| format!("chat.postMessage request failed: {e}"))?;

    let body: SlackApiResponse = resp
        .json()
        .await
        .map_err(|e| format!("chat.postMessage parse failed: {e}"))?;

    if !body.ok {
        let err = body.error.unwrap_or_else(|| "unknown".to_string());
        return Err(format!("chat.postMessage error: {err}"));
    }

    body.ts
        .ok_or_else(|| "chat.postMessage: no ts in response".to_string())
}

/// Reply through an interaction `response_url`, optionally replacing the
/// original message (used by notification buttons).
pub async fn respond(
    client: &Client,
    response_url: &str,
    text: &str,
    replace_original: bool,
) -> Result<(), String> {
    let resp = client
        .post(response_url)
        .json(&serde_json::json!({
            "replace_original": replace_original,
            "text": text,
        }))
        .send()
        .await
        .map_err(|e| format!("response_url request failed: {e}"))?;

    if !resp.status().is_success() {
        warn!("response_url reply failed: status={}", resp.status());
    }

    Ok(())
}
