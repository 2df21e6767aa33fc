/// Lightweight message heuristics that gate the turn flow before and
/// around the LLM call.

const TIME_WORDS: &[&str] = &[
    "am", "pm", "noon", "midnight", "morning", "afternoon", "evening", "min", "mins", "minute",
    "minutes", "hour", "hours",
];

/// Whether the text carries any usable time information.
pub fn message_mentions_time(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != ':')
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| TIME_WORDS.contains(w)) {
        return true;
    }

    text.chars().any(|c| c.is_ascii_digit())
        && (text.contains(':') || lowered.contains("am") || lowered.contains("pm"))
}

pub fn is_confirmation(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "yes" | "yep" | "yeah" | "y" | "ok" | "okay" | "sure" | "confirm" | "correct"
            | "that works"
    )
}

pub fn is_rejection(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "no" | "nope" | "nah" | "cancel")
}

/// Accepted replies for the "use the suggested time?" prompt.
pub fn accepts_suggested_time(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "yes" | "y" | "sure" | "ok" | "okay" | "use it" | "go ahead"
    )
}

/// "first"/"second"/"third" (or 1/2/3) answers to a clarify question.
pub fn parse_selection_index(text: &str) -> Option<usize> {
    match text.trim().to_lowercase().as_str() {
        "first" | "1" | "one" => Some(0),
        "second" | "2" | "two" => Some(1),
        "third" | "3" | "three" => Some(2),
        _ => None,
    }
}

/// Keyword-bucket category inference over title + description.
pub fn infer_category(title: &str, description: &str) -> &'static str {
    let text = format!("{title} {description}").to_lowercase();

    let contains_any = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if contains_any(&["mom", "dad", "family", "parent", "sister", "brother"]) {
        return "family";
    }
    if contains_any(&["meeting", "call", "client", "deck", "review", "office", "report"]) {
        return "work";
    }
    if contains_any(&["doctor", "dentist", "med", "health", "appointment", "therapy"]) {
        return "health";
    }
    if contains_any(&["bill", "rent", "payment", "invoice", "tax", "bank"]) {
        return "finance";
    }
    "personal"
}

/// Lowercase alphanumeric words only, used for duplicate-title matching.
pub fn normalize_title(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Obvious command-shaped messages skip the Mem0 prefetch: the DB-backed
/// tools will run anyway, and the retrieval round-trip only adds latency.
pub fn should_skip_mem0_prefetch(message: &str) -> bool {
    let text = message.to_lowercase();
    if ["list", "show", "search", "find", "what reminders", "all reminders"]
        .iter()
        .any(|w| text.contains(w))
    {
        return true;
    }
    [
        "remind me",
        "set a reminder",
        "create reminder",
        "create a reminder",
        "schedule",
        "snooze",
        "reschedule",
        "postpone",
        "shift",
        "move",
        "update",
        "change",
        "done",
        "complete",
        "mark done",
    ]
    .iter()
    .any(|w| text.contains(w))
}

/// Map a preference key to a reminder-time category.
/// `default_reminder_time` -> `default`; `reminder_time:work` -> `work`.
pub fn time_preference_category(key: &str) -> Option<String> {
    let normalized = key.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if matches!(
        normalized.as_str(),
        "default_time" | "default_reminder_time" | "reminder_time"
    ) {
        return Some("default".to_string());
    }
    for prefix in ["reminder_time:", "reminder_time_", "default_time:"] {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            let rest = rest.trim();
            if rest.is_empty() {
                return None;
            }
            return Some(rest.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_mentions() {
        assert!(message_mentions_time("call at 3pm"));
        assert!(message_mentions_time("in 30 minutes"));
        assert!(message_mentions_time("15:30 works"));
        assert!(message_mentions_time("tomorrow morning"));
        assert!(!message_mentions_time("remind me to buy milk tomorrow"));
        assert!(!message_mentions_time("call with the team"));
    }

    #[test]
    fn confirmations_and_rejections() {
        assert!(is_confirmation("Yes"));
        assert!(is_confirmation("that works"));
        assert!(!is_confirmation("yes please at 4"));
        assert!(is_rejection("nope"));
        assert!(!is_rejection("not now"));
        assert!(accepts_suggested_time("go ahead"));
        assert!(!accepts_suggested_time("that works"));
    }

    #[test]
    fn selection_indices() {
        assert_eq!(parse_selection_index("first"), Some(0));
        assert_eq!(parse_selection_index(" 2 "), Some(1));
        assert_eq!(parse_selection_index("three"), Some(2));
        assert_eq!(parse_selection_index("fourth"), None);
    }

    #[test]
    fn category_buckets() {
        assert_eq!(infer_category("call mom", ""), "family");
        assert_eq!(infer_category("client review", ""), "work");
        assert_eq!(infer_category("dentist appointment", ""), "health");
        assert_eq!(infer_category("pay rent", ""), "finance");
        assert_eq!(infer_category("buy milk", ""), "personal");
        // Description participates too.
        assert_eq!(infer_category("errand", "drop the tax forms"), "finance");
    }

    #[test]
    fn title_normalization_collapses_punctuation_and_case() {
        assert_eq!(normalize_title("  Pay RENT!  "), "pay rent");
        assert_eq!(normalize_title("pay rent"), normalize_title("Pay, rent."));
    }

    #[test]
    fn prefetch_skip_for_command_messages() {
        assert!(should_skip_mem0_prefetch("list my reminders"));
        assert!(should_skip_mem0_prefetch("remind me to pay rent"));
        assert!(should_skip_mem0_prefetch("snooze that"));
        assert!(!should_skip_mem0_prefetch("how was my week?"));
    }

    #[test]
    fn time_preference_keys() {
        assert_eq!(
            time_preference_category("default_reminder_time"),
            Some("default".to_string())
        );
        assert_eq!(
            time_preference_category("reminder_time:work"),
            Some("work".to_string())
        );
        assert_eq!(
            time_preference_category("reminder_time_family"),
            Some("family".to_string())
        );
        assert_eq!(time_preference_category("timezone"), None);
        assert_eq!(time_preference_category("reminder_time:"), None);
    }
}
