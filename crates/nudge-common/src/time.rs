use chrono::{DateTime, Local, TimeZone, Timelike};

/// Current wall-clock time as unix epoch seconds.
pub fn now_epoch() -> i64 {
    Local::now().timestamp()
}

fn day_ordinal(day: u32) -> String {
    let suffix = match day % 100 {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{day}{suffix}")
}

fn hour_minute_label(dt: &DateTime<Local>) -> String {
    let (is_pm, hour12) = dt.hour12();
    let suffix = if is_pm { "PM" } else { "AM" };
    format!("{}:{:02} {}", hour12, dt.minute(), suffix)
}

/// Human-friendly due label, e.g. `3rd Sep, 4:30 PM`. `None` renders as `N/A`.
pub fn format_due_label(epoch: Option<i64>) -> String {
    let Some(epoch) = epoch else {
        return "N/A".to_string();
    };
    let Some(dt) = Local.timestamp_opt(epoch, 0).single() else {
        return "N/A".to_string();
    };
    format!(
        "{} {}, {}",
        day_ordinal(chrono::Datelike::day(&dt)),
        dt.format("%b"),
        hour_minute_label(&dt)
    )
}

/// Render a 24h `HH:MM` preference value as a 12h label, e.g. `16:30` -> `4:30 PM`.
/// Unparseable input is returned unchanged.
pub fn format_time_12h(time_24h: &str) -> String {
    let mut parts = time_24h.splitn(2, ':');
    let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
        return time_24h.to_string();
    };
    let (Ok(hour), Ok(minute)) = (h.trim().parse::<u32>(), m.trim().parse::<u32>()) else {
        return time_24h.to_string();
    };
    if hour > 23 || minute > 59 {
        return time_24h.to_string();
    }
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{hour12}:{minute:02} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_cover_teens_and_edges() {
        assert_eq!(day_ordinal(1), "1st");
        assert_eq!(day_ordinal(2), "2nd");
        assert_eq!(day_ordinal(3), "3rd");
        assert_eq!(day_ordinal(4), "4th");
        assert_eq!(day_ordinal(11), "11th");
        assert_eq!(day_ordinal(12), "12th");
        assert_eq!(day_ordinal(13), "13th");
        assert_eq!(day_ordinal(21), "21st");
        assert_eq!(day_ordinal(22), "22nd");
        assert_eq!(day_ordinal(23), "23rd");
        assert_eq!(day_ordinal(31), "31st");
    }

    #[test]
    fn missing_due_renders_na() {
        assert_eq!(format_due_label(None), "N/A");
    }

    #[test]
    fn twelve_hour_labels() {
        assert_eq!(format_time_12h("00:05"), "12:05 AM");
        assert_eq!(format_time_12h("09:00"), "9:00 AM");
        assert_eq!(format_time_12h("12:00"), "12:00 PM");
        assert_eq!(format_time_12h("16:30"), "4:30 PM");
        assert_eq!(format_time_12h("garbage"), "garbage");
        assert_eq!(format_time_12h("25:00"), "25:00");
    }
}
