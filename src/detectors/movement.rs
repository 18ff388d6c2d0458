//! Movement detectors
//!
//! The host samples player physics each tick and feeds the samples here.
//! Exempt states (flying with permission, gliding, climbing, swimming,
//! riding) are decided by the host and arrive as a flag; baselining speed in
//! those states produces too many false positives to be worth it.

use crate::core::config::EngineConfig;
use crate::core::types::Violation;

/// Check type reported by [`check_speed`].
pub const MOVEMENT_SPEED: &str = "movement_speed";
/// Check type reported by [`check_no_fall`].
pub const MOVEMENT_NO_FALL: &str = "movement_no_fall";
/// Check type reported by [`check_fly_hover`].
pub const MOVEMENT_FLY_HOVER: &str = "movement_fly_hover";

/// One physics sample for a player.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementSample {
    /// Horizontal speed in blocks per second
    pub horizontal_speed_bps: f64,
    /// Vertical speed in blocks per second (positive = up)
    pub vertical_speed_bps: f64,
    /// Level of an active speed-boosting effect; `None` when unaffected
    pub speed_effect_level: Option<u8>,
    /// Consecutive ticks the player has been off the ground
    pub off_ground_ticks: u32,
    /// Host says normal movement limits do not apply right now
    pub exempt: bool,
}

/// Horizontal speed above the allowed ceiling.
///
/// The ceiling is the configured maximum plus a per-level effect bonus plus
/// a flat tolerance buffer for position jitter.
pub fn check_speed(config: &EngineConfig, sample: &MovementSample) -> Option<Violation> {
    if sample.exempt {
        return None;
    }

    let mut max_bps = config.max_horizontal_speed_bps;
    if let Some(level) = sample.speed_effect_level {
        max_bps += f64::from(level + 1) * config.speed_effect_bonus_bps;
    }
    max_bps += config.speed_tolerance_bps;

    if sample.horizontal_speed_bps > max_bps {
        return Some(
            Violation::new(MOVEMENT_SPEED)
                .with_detail("speed_bps", format!("{:.2}", sample.horizontal_speed_bps))
                .with_detail("max_bps", format!("{:.2}", max_bps)),
        );
    }
    None
}

/// Landed from a damaging height without taking fall damage.
pub fn check_no_fall(
    config: &EngineConfig,
    fall_distance: f64,
    took_fall_damage: bool,
) -> Option<Violation> {
    if fall_distance >= config.min_no_fall_distance && !took_fall_damage {
        return Some(
            Violation::new(MOVEMENT_NO_FALL)
                .with_detail("fall_distance", format!("{:.1}", fall_distance)),
        );
    }
    None
}

/// Hovering: airborne for many ticks with near-zero vertical motion.
pub fn check_fly_hover(config: &EngineConfig, sample: &MovementSample) -> Option<Violation> {
    if sample.exempt {
        return None;
    }
    if sample.off_ground_ticks >= config.hover_tick_threshold
        && sample.vertical_speed_bps.abs() < 0.1
    {
        return Some(
            Violation::new(MOVEMENT_FLY_HOVER)
                .with_detail("off_ground_ticks", sample.off_ground_ticks)
                .with_detail("vertical_bps", format!("{:.2}", sample.vertical_speed_bps)),
        );
    }
    None
}
