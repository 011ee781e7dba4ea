use chrono::{DateTime, FixedOffset, TimeZone, Utc};

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

/// Human age of `timestamp` relative to `now` ("3 hours ago", "Yesterday")
pub fn relative_age<Tz: TimeZone>(timestamp: &DateTime<FixedOffset>, now: &DateTime<Tz>) -> String {
    let elapsed = now.with_timezone(&Utc) - timestamp.with_timezone(&Utc);
    let seconds = elapsed.num_seconds().max(0);
    let days = seconds / 86_400;

    match days {
        0 if seconds < 3_600 => plural(seconds / 60, "minute"),
        0 => plural(seconds / 3_600, "hour"),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        7..=29 => plural(days / 7, "week"),
        30..=364 => plural(days / 30, "month"),
        _ => plural(days / 365, "year"),
    }
}

/// Absolute form in the commit's own offset, e.g. `05. Mar 2024 at 14:02`
pub fn absolute_age(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format("%d. %b %Y at %H:%M").to_string()
}
