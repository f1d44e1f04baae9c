use jiff::{Timestamp, tz::TimeZone};

/// Format a timestamp as a short relative string like "2d ago", "3h ago",
/// "15m ago" or "just now". Anything older than a year shows the date.
pub fn format_relative(timestamp: &Timestamp) -> String {
    format_relative_to(timestamp, Timestamp::now())
}

pub fn format_relative_to(timestamp: &Timestamp, now: Timestamp) -> String {
    let now_secs = now.as_second();
    let ts = timestamp.as_second();

    if now_secs <= ts {
        return "just now".to_string();
    }

    let delta = now_secs - ts;
    let days = delta / 86_400;
    if days >= 365 {
        return format_date(timestamp);
    }
    if days > 0 {
        return format!("{}d ago", days);
    }

    let hours = delta / 3_600;
    if hours > 0 {
        return format!("{}h ago", hours);
    }

    let minutes = delta / 60;
    if minutes > 0 {
        return format!("{}m ago", minutes);
    }

    "just now".to_string()
}

/// Calendar date in the local time zone, e.g. "2023-11-14".
pub fn format_date(timestamp: &Timestamp) -> String {
    timestamp
        .to_zoned(TimeZone::system())
        .strftime("%Y-%m-%d")
        .to_string()
}

/// Steam reports playtime in minutes. `0` -> "never played".
pub fn format_playtime(minutes: u64) -> String {
    match (minutes / 60, minutes % 60) {
        (0, 0) => "never played".to_string(),
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}
