use chrono::{DateTime, TimeDelta, Utc};

use crate::contest::Contest;
use crate::registry::time_remaining;

pub const NO_CONTESTS_LINE: &str = "No upcoming contests";
pub const IN_PROGRESS_LINE: &str = "Contest in progress!";

/// `2d 5h`, `5h 12m` or `12m`. Negative durations render as `0m`.
pub fn format_countdown(delta: TimeDelta) -> String {
    let total = delta.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Table cell for the "Starts In" column.
pub fn format_starts_in(delta: TimeDelta) -> String {
    if delta < TimeDelta::zero() {
        "started".to_string()
    } else {
        format_countdown(delta)
    }
}

pub fn truncate_event(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = name.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// One-line summary of the first contest, for panel widgets like polybar.
pub fn next_contest_line(
    contests: &[Contest],
    now: DateTime<Utc>,
    max_event_chars: usize,
) -> String {
    let Some(next) = contests.first() else {
        return NO_CONTESTS_LINE.to_string();
    };
    let remaining = time_remaining(next, now);
    if remaining < TimeDelta::zero() {
        return IN_PROGRESS_LINE.to_string();
    }
    format!(
        "{} (in {})",
        truncate_event(&next.event_name, max_event_chars),
        format_countdown(remaining)
    )
}
