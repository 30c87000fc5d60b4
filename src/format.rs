use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

/// Renders an elapsed duration the way the status badge shows it.
///
/// Buckets floor rather than round: `59` is `"59s"`, `119` is `"1 min"`,
/// `3659` is `"1 hr"`.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes} min");
    }

    let hours = minutes / 60;
    let remaining_min = minutes % 60;
    if remaining_min == 0 {
        format!("{hours} hr")
    } else {
        format!("{hours} hr {remaining_min} min")
    }
}

pub fn format_last_seen<Tz>(last_seen: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = last_seen.with_timezone(tz);
    format!("Last seen: {}", local.format("%-m/%-d/%Y, %-I:%M:%S %p"))
}

pub fn format_last_updated<Tz>(now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = now.with_timezone(tz);
    format!("Last updated: {}", local.format("%B %-d, %Y, %I:%M %p"))
}

/// Text for a numeric reading, `--` when the reading is absent.
pub fn format_reading(value: Option<f64>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

pub const PLACEHOLDER: &str = "--";
