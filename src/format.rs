use chrono::{DateTime, Local, TimeZone, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Short age label for a post: "now", "N min(s)", "Nh", or the local
/// calendar date once a day has passed.
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    relative_time_in(timestamp, now, &Local)
}

pub fn relative_time_in<Tz: TimeZone>(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    zone: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let elapsed = (now - timestamp).num_seconds();
    if elapsed < MINUTE {
        return "now".to_string();
    }
    if elapsed < HOUR {
        let minutes = elapsed / MINUTE;
        let unit = if minutes == 1 { "min" } else { "mins" };
        return format!("{minutes} {unit}");
    }
    if elapsed < DAY {
        return format!("{}h", elapsed / HOUR);
    }
    timestamp
        .with_timezone(zone)
        .format("%-m/%-d/%Y")
        .to_string()
}

pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|segment| segment.chars().next())
        .collect::<String>()
        .to_uppercase()
}

/// Never clamps; callers decide how to show a negative budget.
pub fn remaining_chars(message: &str, max: usize) -> i64 {
    max as i64 - message.chars().count() as i64
}
