//! World-interaction detectors

use crate::core::config::EngineConfig;
use crate::core::types::{TimestampMs, Violation};

/// Check type reported by [`check_break_rate`].
pub const WORLD_NUKER: &str = "world_nuker";
/// Check type reported by [`check_illegal_item`].
pub const WORLD_ILLEGAL_ITEM: &str = "world_illegal_item";

/// Too many blocks broken inside the sliding window (nuker / fast-break).
///
/// `break_history` holds the timestamps of recent block breaks, including
/// the one that just happened; the caller owns trimming old entries.
pub fn check_break_rate(
    config: &EngineConfig,
    break_history: &[TimestampMs],
    now: TimestampMs,
) -> Option<Violation> {
    let window_start = now.saturating_sub(config.break_window_ms);
    let in_window = break_history.iter().filter(|&&t| t >= window_start).count();
    if in_window > config.break_window_max_blocks {
        return Some(
            Violation::new(WORLD_NUKER)
                .with_detail("blocks_in_window", in_window)
                .with_detail("window_ms", config.break_window_ms),
        );
    }
    None
}

/// Use of an item on the banned list.
pub fn check_illegal_item(config: &EngineConfig, item_id: &str) -> Option<Violation> {
    if config.banned_items.iter().any(|banned| banned == item_id) {
        return Some(Violation::new(WORLD_ILLEGAL_ITEM).with_detail("item_id", item_id));
    }
    None
}
