//! Chat-content detectors
//!
//! Each function inspects one message (or its timing) and reports a
//! violation when a pattern matches. Detectors know nothing about
//! punishment: they hand their finding to the ingress and move on.

use crate::core::config::EngineConfig;
use crate::core::types::{TimestampMs, Violation};

/// Check type reported by [`check_message_rate`].
pub const CHAT_SPAM_FAST: &str = "chat_spam_fast";
/// Check type reported by [`check_char_repeat`].
pub const CHAT_CHAR_REPEAT: &str = "chat_char_repeat";
/// Check type reported by [`check_caps_abuse`].
pub const CHAT_CAPS_ABUSE: &str = "chat_caps_abuse";

/// Message sent too soon after the previous one.
pub fn check_message_rate(
    config: &EngineConfig,
    last_message_ms: Option<TimestampMs>,
    now: TimestampMs,
) -> Option<Violation> {
    let last = last_message_ms?;
    let interval = now.saturating_sub(last);
    if interval < config.fast_message_threshold_ms {
        return Some(
            Violation::new(CHAT_SPAM_FAST)
                .with_detail("interval_ms", interval)
                .with_detail("threshold_ms", config.fast_message_threshold_ms),
        );
    }
    None
}

/// Run of one repeated character longer than allowed (e.g. "heyyyyyyyyyy").
pub fn check_char_repeat(config: &EngineConfig, message: &str) -> Option<Violation> {
    let mut run_char = None;
    let mut run_len = 0usize;
    let mut longest: Option<(char, usize)> = None;

    for c in message.chars() {
        if Some(c) == run_char {
            run_len += 1;
        } else {
            run_char = Some(c);
            run_len = 1;
        }
        if longest.map(|(_, len)| run_len > len).unwrap_or(true) {
            longest = Some((c, run_len));
        }
    }

    match longest {
        Some((c, len)) if len > config.char_repeat_threshold => Some(
            Violation::new(CHAT_CHAR_REPEAT)
                .with_detail("char", c)
                .with_detail("run_length", len)
                .with_detail("threshold", config.char_repeat_threshold),
        ),
        _ => None,
    }
}

/// Mostly-uppercase message. Short messages are exempt so "OK" and "LOL"
/// pass; the ratio only considers alphabetic characters.
pub fn check_caps_abuse(config: &EngineConfig, message: &str) -> Option<Violation> {
    let letters: Vec<char> = message.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < config.caps_min_length {
        return None;
    }

    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    let ratio = upper as f64 / letters.len() as f64;
    if ratio > config.caps_max_ratio {
        return Some(
            Violation::new(CHAT_CAPS_ABUSE)
                .with_detail("upper_ratio", format!("{:.2}", ratio))
                .with_detail("letter_count", letters.len()),
        );
    }
    None
}
