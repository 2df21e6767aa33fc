use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;
use nudge_channels::slack::{api as slack_api, blocks};
use nudge_common::now_epoch;
use tracing::{info, warn};

use crate::state::SharedState;

/// Periodically push due-soon reminders to the Slack DM channels learned
/// from incoming events.
pub fn spawn_notify_loop(state: &SharedState) {
    if !state.config.slack.notify_enabled {
        return;
    }

    let interval_seconds = state.config.slack.notify_interval_seconds.max(1);
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            interval.tick().await;
            let sent = send_due_notifications(&state, None).await;
            if sent > 0 {
                info!("pushed {sent} due reminder notification(s) to Slack");
            }
        }
    });
}

/// Send Block Kit notifications for reminders inside the lead window.
/// Returns how many messages were posted.
pub async fn send_due_notifications(state: &SharedState, user_id: Option<&str>) -> usize {
    let Some(bot_token) = state.slack_bot_token() else {
        return 0;
    };

    let targets: Vec<(String, String)> = match user_id {
        Some(user_id) => state
            .slack_user_channels
            .get(user_id)
            .map(|channel| vec![(user_id.to_string(), channel.value().clone())])
            .unwrap_or_default(),
        None => state
            .slack_user_channels
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect(),
    };

    let lead = state.config.agent.notify_lead_seconds;
    let tz = state.agents.timezone();
    let mut sent = 0;

    for (slack_user_id, channel) in targets {
        let due_soon = match state
            .store
            .get_due_soon_reminders(&slack_user_id, now_epoch(), lead)
        {
            Ok(reminders) => reminders,
            Err(e) => {
                warn!("due-soon query failed for {slack_user_id}: {e}");
                continue;
            }
        };

        for reminder in due_soon {
            let Some(due_at) = reminder.due_at_epoch else {
                continue;
            };
            let due_label = tz
                .timestamp_opt(due_at, 0)
                .single()
                .map(|dt| dt.format("%b %d %I:%M %p").to_string())
                .unwrap_or_default();
            let blocks = blocks::reminder_notification(&reminder.title, &due_label, reminder.id);

            match slack_api::post_message(
                &state.http,
                bot_token,
                &channel,
                &format!("Reminder: {}", reminder.title),
                Some(&blocks),
            )
            .await
            {
                Ok(_) => {
                    if let Err(e) = state.store.mark_reminder_notified(
                        reminder.id,
                        &slack_user_id,
                        now_epoch(),
                    ) {
                        warn!("failed to mark reminder {} notified: {e}", reminder.id);
                    }
                    sent += 1;
                }
                Err(e) => warn!("slack notification failed: {e}"),
            }
        }
    }

    sent
}
