use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in\s+)?(\d+)\s*(min|mins|minute|minutes|hour|hours|hr|hrs|day|days|week|weeks)\b")
        .expect("relative regex is valid")
});

static MERIDIEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").expect("meridiem regex is valid")
});

static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("clock regex is valid"));

static AT_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bat\s+(\d{1,2})\b").expect("at-hour regex is valid"));

static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(next\s+|this\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
        .expect("weekday regex is valid")
});

/// Parse a natural-language due phrase into epoch seconds, preferring
/// future interpretations. Handles relative offsets ("in 30 minutes"),
/// day anchors ("tomorrow", "next monday"), clock times ("3pm", "15:30",
/// "noon"), combinations of both, and ISO-style fallbacks.
pub fn parse_datetime(text: &str, tz: Tz) -> Option<i64> {
    parse_datetime_at(text, tz, Utc::now().with_timezone(&tz))
}

pub fn parse_datetime_at(text: &str, tz: Tz, now: DateTime<Tz>) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(epoch) = parse_absolute(text, tz) {
        return Some(epoch);
    }

    if let Some(epoch) = parse_relative(text, &now) {
        return Some(epoch);
    }

    let day = parse_day_anchor(text, &now);
    let time = parse_time_of_day(text);

    if day.is_none() && time.is_none() {
        return None;
    }

    let (target_date, tonight) = match &day {
        Some(anchor) => (anchor.date, anchor.tonight),
        None => (now.date_naive(), false),
    };

    let (hour, minute) = match time {
        Some((h, m)) => (h, m),
        // "tonight" without a clock time means the evening.
        None if tonight => (20, 0),
        None => (now.hour(), now.minute()),
    };

    let candidate = resolve_local(tz, target_date, hour, minute)?;

    // A bare clock time that already passed today rolls to tomorrow.
    if candidate <= now && day.is_none() {
        let tomorrow = target_date.succ_opt()?;
        return resolve_local(tz, tomorrow, hour, minute).map(|dt| dt.timestamp());
    }

    // A weekday whose occurrence already passed rolls a week forward.
    if candidate <= now
        && let Some(anchor) = &day
        && anchor.weekday
    {
        let next_week = target_date + Duration::days(7);
        return resolve_local(tz, next_week, hour, minute).map(|dt| dt.timestamp());
    }

    Some(candidate.timestamp())
}

struct DayAnchor {
    date: NaiveDate,
    weekday: bool,
    tonight: bool,
}

fn parse_absolute(text: &str, tz: Tz) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp());
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return tz.from_local_datetime(&naive).earliest().map(|dt| dt.timestamp());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let naive = date.and_hms_opt(9, 0, 0)?;
        return tz.from_local_datetime(&naive).earliest().map(|dt| dt.timestamp());
    }

    None
}

fn parse_relative(text: &str, now: &DateTime<Tz>) -> Option<i64> {
    let caps = RELATIVE_RE.captures(text)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();

    let delta = match unit.as_str() {
        "min" | "mins" | "minute" | "minutes" => Duration::minutes(amount),
        "hour" | "hours" | "hr" | "hrs" => Duration::hours(amount),
        "day" | "days" => Duration::days(amount),
        "week" | "weeks" => Duration::weeks(amount),
        _ => return None,
    };

    // "2 days" with a clock time ("in 2 days at 9am") is handled by the
    // anchor path; a bare duration lands exactly delta from now.
    if matches!(unit.as_str(), "day" | "days" | "week" | "weeks")
        && parse_time_of_day(text).is_some()
    {
        return None;
    }

    Some((*now + delta).timestamp())
}

fn parse_day_anchor(text: &str, now: &DateTime<Tz>) -> Option<DayAnchor> {
    let lowered = text.to_lowercase();
    let today = now.date_naive();

    if lowered.contains("day after tomorrow") {
        return Some(DayAnchor {
            date: today + Duration::days(2),
            weekday: false,
            tonight: false,
        });
    }
    if lowered.contains("tomorrow") {
        return Some(DayAnchor {
            date: today + Duration::days(1),
            weekday: false,
            tonight: false,
        });
    }
    if lowered.contains("tonight") {
        return Some(DayAnchor {
            date: today,
            weekday: false,
            tonight: true,
        });
    }
    if lowered.contains("today") {
        return Some(DayAnchor {
            date: today,
            weekday: false,
            tonight: false,
        });
    }

    if let Some(caps) = WEEKDAY_RE.captures(&lowered) {
        let explicit_next = caps
            .get(1)
            .map(|m| m.as_str().trim() == "next")
            .unwrap_or(false);
        let target = match caps.get(2)?.as_str() {
            "monday" => Weekday::Mon,
            "tuesday" => Weekday::Tue,
            "wednesday" => Weekday::Wed,
            "thursday" => Weekday::Thu,
            "friday" => Weekday::Fri,
            "saturday" => Weekday::Sat,
            "sunday" => Weekday::Sun,
            _ => return None,
        };

        let mut days_ahead = (target.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        if days_ahead == 0 && explicit_next {
            days_ahead = 7;
        }

        return Some(DayAnchor {
            date: today + Duration::days(days_ahead),
            weekday: true,
            tonight: false,
        });
    }

    // "in 2 days at 9am" style: duration anchor combined with a clock time.
    if let Some(caps) = RELATIVE_RE.captures(&lowered) {
        let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2)?.as_str();
        let days = match unit {
            "day" | "days" => amount,
            "week" | "weeks" => amount * 7,
            _ => return None,
        };
        if parse_time_of_day(&lowered).is_some() {
            return Some(DayAnchor {
                date: today + Duration::days(days),
                weekday: false,
                tonight: false,
            });
        }
    }

    None
}

fn parse_time_of_day(text: &str) -> Option<(u32, u32)> {
    let lowered = text.to_lowercase();

    if lowered.contains("noon") {
        return Some((12, 0));
    }
    if lowered.contains("midnight") {
        return Some((0, 0));
    }

    if let Some(caps) = MERIDIEM_RE.captures(&lowered) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps
            .get(2)
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0);
        if hour >= 1 && hour <= 12 && minute <= 59 {
            let is_pm = caps.get(3)?.as_str() == "pm";
            let hour24 = match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            };
            return Some((hour24, minute));
        }
    }

    if let Some(caps) = CLOCK_RE.captures(&lowered) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        if hour <= 23 && minute <= 59 {
            return Some((hour, minute));
        }
    }

    if let Some(caps) = AT_HOUR_RE.captures(&lowered) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        if hour <= 23 {
            return Some((hour, 0));
        }
    }

    None
}

fn resolve_local(tz: Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    tz.from_local_datetime(&naive).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TZ: Tz = chrono_tz::Asia::Kolkata;

    /// Monday 2025-03-10 10:00 IST.
    fn monday_morning() -> DateTime<Tz> {
        TZ.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
    }

    fn parse(text: &str) -> Option<DateTime<Tz>> {
        parse_datetime_at(text, TZ, monday_morning())
            .map(|epoch| TZ.timestamp_opt(epoch, 0).unwrap())
    }

    #[test]
    fn relative_minutes_and_hours() {
        let now = monday_morning();
        assert_eq!(
            parse("in 30 minutes").unwrap(),
            now + Duration::minutes(30)
        );
        assert_eq!(parse("30 minutes").unwrap(), now + Duration::minutes(30));
        assert_eq!(parse("in 2 hours").unwrap(), now + Duration::hours(2));
        assert_eq!(parse("in 3 days").unwrap(), now + Duration::days(3));
    }

    #[test]
    fn tomorrow_with_clock_time() {
        let dt = parse("tomorrow 3pm").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 11, 15, 0, 0).unwrap());

        let dt = parse("tomorrow at 9").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap());
    }

    #[test]
    fn tomorrow_without_time_keeps_current_time() {
        let dt = parse("tomorrow").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 11, 10, 0, 0).unwrap());
    }

    #[test]
    fn bare_time_prefers_future() {
        // 9am already passed at 10:00, so it rolls to tomorrow.
        let dt = parse("9am").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap());

        // 11am is still ahead today.
        let dt = parse("11am").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 10, 11, 0, 0).unwrap());

        let dt = parse("15:30").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 10, 15, 30, 0).unwrap());
    }

    #[test]
    fn twelve_hour_edges() {
        let dt = parse("tomorrow 12pm").unwrap();
        assert_eq!(dt.hour(), 12);
        let dt = parse("tomorrow 12am").unwrap();
        assert_eq!(dt.hour(), 0);
        let dt = parse("tomorrow at noon").unwrap();
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn weekday_references() {
        // Friday of the same week.
        let dt = parse("friday 9am").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());

        // "next monday" from a Monday is a week out, current time preserved.
        let dt = parse("next monday").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 17, 10, 0, 0).unwrap());

        // A weekday time that already passed today rolls a full week.
        let dt = parse("monday 9am").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 17, 9, 0, 0).unwrap());
    }

    #[test]
    fn tonight_defaults_to_evening() {
        let dt = parse("tonight").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 10, 20, 0, 0).unwrap());

        let dt = parse("tonight at 11pm").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 10, 23, 0, 0).unwrap());
    }

    #[test]
    fn day_after_tomorrow() {
        let dt = parse("day after tomorrow 8am").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 12, 8, 0, 0).unwrap());
    }

    #[test]
    fn duration_with_clock_time_anchors_the_day() {
        let dt = parse("in 2 days at 9am").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap());
    }

    #[test]
    fn absolute_formats() {
        let dt = parse("2025-04-01 08:30").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 4, 1, 8, 30, 0).unwrap());

        let epoch = parse_datetime_at("2025-04-01T08:30:00+05:30", TZ, monday_morning()).unwrap();
        assert_eq!(
            epoch,
            TZ.with_ymd_and_hms(2025, 4, 1, 8, 30, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn embedded_phrases_parse() {
        let dt = parse("shift that call to 4pm tomorrow").unwrap();
        assert_eq!(dt, TZ.with_ymd_and_hms(2025, 3, 11, 16, 0, 0).unwrap());
    }

    #[test]
    fn rejects_text_without_time_information() {
        assert!(parse("buy milk").is_none());
        assert!(parse("").is_none());
        assert!(parse("whenever you feel like it").is_none());
    }
}
