use serde_json::{Value, json};

/// Block Kit payload for a due-reminder notification: the reminder text
/// plus Done and Snooze-10m buttons carrying the reminder id.
pub fn reminder_notification(title: &str, due_label: &str, reminder_id: i64) -> Value {
    json!([
        {
            "type": "section",
            "text": {"type": "mrkdwn", "text": format!("*{title}*\nDue {due_label}")}
        },
        {
            "type": "actions",
            "elements": [
                {
                    "type": "button",
                    "text": {"type": "plain_text", "text": "Done"},
                    "style": "primary",
                    "action_id": "reminder_done",
                    "value": reminder_id.to_string(),
                },
                {
                    "type": "button",
                    "text": {"type": "plain_text", "text": "Snooze 10m"},
                    "action_id": "reminder_snooze_10m",
                    "value": reminder_id.to_string(),
                },
            ],
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_carries_reminder_id_on_both_buttons() {
        let blocks = reminder_notification("pay rent", "Apr 01 9:00 AM", 42);
        let elements = &blocks[1]["elements"];

        assert_eq!(elements[0]["action_id"], "reminder_done");
        assert_eq!(elements[0]["value"], "42");
        assert_eq!(elements[1]["action_id"], "reminder_snooze_10m");
        assert_eq!(elements[1]["value"], "42");
    }

    #[test]
    fn notification_section_mentions_title_and_due() {
        let blocks = reminder_notification("pay rent", "Apr 01 9:00 AM", 42);
        let text = blocks[0]["text"]["text"].as_str().unwrap();
        assert!(text.contains("pay rent"));
        assert!(text.contains("Due Apr 01 9:00 AM"));
    }
}
