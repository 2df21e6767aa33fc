use serde_json::{Value, json};

use nudge_common::format_due_label;
use nudge_db::Reminder;

use crate::anthropic::ToolDefinition;

/// Tool registry handed to the model on every turn.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let tool = |name: &str, description: &str, schema: Value| ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: schema,
    };

    vec![
        tool(
            "create_reminder",
            "Create a new reminder with title, optional description, and due date/time. Parse natural language dates.",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Reminder title"},
                    "description": {"type": "string", "description": "Optional reminder description"},
                    "due_str": {"type": "string", "description": "Natural language date/time (e.g., 'tomorrow 3pm', 'next Monday')"}
                },
                "required": ["title", "due_str"]
            }),
        ),
        tool(
            "update_reminder",
            "Update an existing reminder's title, description, or due date",
            json!({
                "type": "object",
                "properties": {
                    "reminder_id": {"type": "integer", "description": "Reminder ID to update"},
                    "title": {"type": "string", "description": "New title (optional)"},
                    "description": {"type": "string", "description": "New description (optional)"},
                    "due_str": {"type": "string", "description": "New due date in natural language (optional)"}
                },
                "required": ["reminder_id"]
            }),
        ),
        tool(
            "mark_done",
            "Mark a reminder as completed",
            json!({
                "type": "object",
                "properties": {
                    "reminder_id": {"type": "integer", "description": "Reminder ID to mark as done"}
                },
                "required": ["reminder_id"]
            }),
        ),
        tool(
            "snooze_reminder",
            "Snooze a reminder to a new time",
            json!({
                "type": "object",
                "properties": {
                    "reminder_id": {"type": "integer", "description": "Reminder ID to snooze"},
                    "snooze_str": {"type": "string", "description": "Snooze duration or time (e.g., '30 minutes', 'tomorrow 9am')"}
                },
                "required": ["reminder_id", "snooze_str"]
            }),
        ),
        tool(
            "list_reminders",
            "List reminders. Use status='active' for upcoming, status='completed' for archived, status='all' for everything.",
            json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["active", "completed", "all"], "description": "Filter by status"}
                }
            }),
        ),
        tool(
            "search_reminders",
            "Search reminders by keyword in title or description",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query"}
                },
                "required": ["query"]
            }),
        ),
        tool(
            "delete_reminder",
            "Delete a reminder permanently (use only when user explicitly requests deletion)",
            json!({
                "type": "object",
                "properties": {
                    "reminder_id": {"type": "integer", "description": "Reminder ID to delete"}
                },
                "required": ["reminder_id"]
            }),
        ),
        tool(
            "set_preference",
            "Set or update user preferences (timezone, notification settings, etc.)",
            json!({
                "type": "object",
                "properties": {
                    "key": {"type": "string", "description": "Preference key (e.g., 'timezone', 'default_reminder_time')"},
                    "value": {"type": "string", "description": "Preference value"}
                },
                "required": ["key", "value"]
            }),
        ),
        tool(
            "get_preferences",
            "Get all user preferences",
            json!({"type": "object", "properties": {}}),
        ),
        tool(
            "list_rescheduled_reminders",
            "List active reminders that were rescheduled (snoozed or due date changed)",
            json!({"type": "object", "properties": {}}),
        ),
        tool(
            "clarify_reminder",
            "When multiple reminders match, ask user to clarify which one",
            json!({
                "type": "object",
                "properties": {
                    "matches": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "List of matching reminders"
                    },
                    "question": {"type": "string", "description": "Clarification question to ask user"}
                },
                "required": ["matches", "question"]
            }),
        ),
    ]
}

/// JSON shape used in tool results and the system-prompt context.
pub fn reminder_to_json(reminder: &Reminder) -> Value {
    json!({
        "id": reminder.id,
        "title": reminder.title,
        "description": reminder.description,
        "due_at_epoch": reminder.due_at_epoch,
        "due_at": format_due_label(reminder.due_at_epoch),
        "status": reminder.status.as_str(),
        "category": reminder.category,
        "reschedule_count": reminder.reschedule_count,
        "last_rescheduled_at": reminder.last_rescheduled_at,
    })
}

/// Grouped plain-text overview returned verbatim for list requests.
pub fn reminder_overview_summary(items: &[Value]) -> String {
    if items.is_empty() {
        return "No reminders found.".to_string();
    }

    let mut active: Vec<&Value> = Vec::new();
    let mut completed: Vec<&Value> = Vec::new();
    let mut other: Vec<&Value> = Vec::new();

    for item in items {
        match item.get("status").and_then(|s| s.as_str()) {
            Some("active") => active.push(item),
            Some("completed") => completed.push(item),
            _ => other.push(item),
        }
    }

    let rescheduled: Vec<&Value> = active
        .iter()
        .filter(|i| i.get("reschedule_count").and_then(|c| c.as_i64()).unwrap_or(0) > 0)
        .copied()
        .collect();
    let upcoming: Vec<&Value> = active
        .iter()
        .filter(|i| i.get("reschedule_count").and_then(|c| c.as_i64()).unwrap_or(0) == 0)
        .copied()
        .collect();

    let sections = [
        format_group("Snoozed/Rescheduled", &rescheduled),
        format_group("Upcoming", &upcoming),
        format_group("Archived", &completed),
        format_group("Other", &other),
    ];

    let header = format!("Here’s your reminders overview ({} total)", items.len());
    let body = sections
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n");

    if body.is_empty() {
        return header;
    }
    format!("{header}\n\n{body}")
}

fn format_group(title: &str, entries: &[&Value]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    // Collapse duplicate (title, due) pairs, preserving first-seen order.
    let mut counts: Vec<((String, String), usize)> = Vec::new();
    for entry in entries {
        let title_text = entry
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        let due_at = entry
            .get("due_at")
            .and_then(|d| d.as_str())
            .unwrap_or("")
            .to_string();
        let key = (title_text, due_at);
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => counts.push((key, 1)),
        }
    }

    let mut lines = vec![format!("{title} ({})", entries.len())];
    for ((title_text, due_at), count) in counts {
        let suffix = if count > 1 {
            format!(" ×{count}")
        } else {
            String::new()
        };
        let due = if due_at.is_empty() {
            String::new()
        } else {
            format!(" — {due_at}")
        };
        lines.push(format!("• {title_text}{due}{suffix}"));
    }
    lines.join("\n")
}

/// Keep the status strings used by the list tool in one place.
pub fn parse_status_filter(status: Option<&str>) -> StatusFilter {
    match status {
        Some("completed") => StatusFilter::Completed,
        Some("rescheduled") => StatusFilter::Rescheduled,
        Some("all") => StatusFilter::All,
        _ => StatusFilter::Active,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Active,
    Completed,
    Rescheduled,
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_all_tools() {
        let names: Vec<String> = tool_definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "create_reminder",
                "update_reminder",
                "mark_done",
                "snooze_reminder",
                "list_reminders",
                "search_reminders",
                "delete_reminder",
                "set_preference",
                "get_preferences",
                "list_rescheduled_reminders",
                "clarify_reminder",
            ]
        );
    }

    #[test]
    fn create_reminder_schema_requires_title_and_due() {
        let tools = tool_definitions();
        let create = tools.iter().find(|t| t.name == "create_reminder").unwrap();
        assert_eq!(
            create.input_schema["required"],
            json!(["title", "due_str"])
        );
    }

    #[test]
    fn empty_overview_has_fixed_text() {
        assert_eq!(reminder_overview_summary(&[]), "No reminders found.");
    }

    #[test]
    fn overview_groups_and_collapses_duplicates() {
        let items = vec![
            json!({"title": "standup", "due_at": "11th Mar, 9:00 AM", "status": "active", "reschedule_count": 0}),
            json!({"title": "standup", "due_at": "11th Mar, 9:00 AM", "status": "active", "reschedule_count": 0}),
            json!({"title": "pay rent", "due_at": "1st Apr, 9:00 AM", "status": "active", "reschedule_count": 2}),
            json!({"title": "old chore", "due_at": "1st Mar, 9:00 AM", "status": "completed", "reschedule_count": 0}),
        ];

        let summary = reminder_overview_summary(&items);
        assert!(summary.starts_with("Here’s your reminders overview (4 total)"));
        assert!(summary.contains("Snoozed/Rescheduled (1)"));
        assert!(summary.contains("Upcoming (2)"));
        assert!(summary.contains("• standup — 11th Mar, 9:00 AM ×2"));
        assert!(summary.contains("Archived (1)"));
        assert!(!summary.contains("Other"));
    }

    #[test]
    fn archived_status_lands_in_other() {
        let items = vec![
            json!({"title": "stale", "due_at": "1st Mar, 9:00 AM", "status": "archived", "reschedule_count": 0}),
        ];
        let summary = reminder_overview_summary(&items);
        assert!(summary.contains("Other (1)"));
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(parse_status_filter(Some("completed")), StatusFilter::Completed);
        assert_eq!(parse_status_filter(Some("all")), StatusFilter::All);
        assert_eq!(parse_status_filter(Some("bogus")), StatusFilter::Active);
        assert_eq!(parse_status_filter(None), StatusFilter::Active);
    }
}
