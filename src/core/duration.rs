//! Duration strings for timed enforcement actions
//!
//! Operators write durations like `15m`, `2h` or `7d` in the rule table; the
//! literals `perm` and `permanent` mean an indefinite punishment. A bare
//! number is read as seconds.

use crate::core::error::{Result, WardenError};

const MS_PER_SECOND: u64 = 1000;
const SECONDS_PER_MINUTE: u64 = 60;
const MINUTES_PER_HOUR: u64 = 60;
const HOURS_PER_DAY: u64 = 24;
const DAYS_PER_WEEK: u64 = 7;

/// Parse a duration string into milliseconds.
///
/// Returns `Ok(None)` for the permanent literals, `Ok(Some(ms))` for a
/// finite duration, and an error for anything else. Matching is
/// case-insensitive.
pub fn parse_duration(input: &str) -> Result<Option<u64>> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return Err(WardenError::InvalidDuration(input.to_string()));
    }

    if s == "perm" || s == "permanent" {
        return Ok(None);
    }

    // Bare integer means seconds.
    if s.chars().all(|c| c.is_ascii_digit()) {
        let value: u64 = s
            .parse()
            .map_err(|_| WardenError::InvalidDuration(input.to_string()))?;
        return Ok(Some(value * MS_PER_SECOND));
    }

    let mut chars = s.chars();
    let unit = chars
        .next_back()
        .ok_or_else(|| WardenError::InvalidDuration(input.to_string()))?;
    let digits = chars.as_str();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(WardenError::InvalidDuration(input.to_string()));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| WardenError::InvalidDuration(input.to_string()))?;

    let ms = match unit {
        's' => value * MS_PER_SECOND,
        'm' => value * SECONDS_PER_MINUTE * MS_PER_SECOND,
        'h' => value * MINUTES_PER_HOUR * SECONDS_PER_MINUTE * MS_PER_SECOND,
        'd' => value * HOURS_PER_DAY * MINUTES_PER_HOUR * SECONDS_PER_MINUTE * MS_PER_SECOND,
        'w' => {
            value
                * DAYS_PER_WEEK
                * HOURS_PER_DAY
                * MINUTES_PER_HOUR
                * SECONDS_PER_MINUTE
                * MS_PER_SECOND
        }
        _ => return Err(WardenError::InvalidDuration(input.to_string())),
    };
    Ok(Some(ms))
}

/// Human-readable rendering of a duration in milliseconds.
///
/// Picks the largest unit that divides evenly, so `900000` renders as `15m`
/// rather than `900s`.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / MS_PER_SECOND;
    if seconds == 0 {
        return format!("{}ms", ms);
    }

    let units = [
        (DAYS_PER_WEEK * HOURS_PER_DAY * MINUTES_PER_HOUR * SECONDS_PER_MINUTE, "w"),
        (HOURS_PER_DAY * MINUTES_PER_HOUR * SECONDS_PER_MINUTE, "d"),
        (MINUTES_PER_HOUR * SECONDS_PER_MINUTE, "h"),
        (SECONDS_PER_MINUTE, "m"),
    ];
    for (unit_seconds, suffix) in units {
        if seconds % unit_seconds == 0 && seconds >= unit_seconds {
            return format!("{}{}", seconds / unit_seconds, suffix);
        }
    }
    format!("{}s", seconds)
}
