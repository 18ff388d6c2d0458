//! Engine configuration with documented constants
//!
//! Detector thresholds and the master switch are collected here. Escalation
//! policy itself lives in the rule table (`rules::RuleTable`), not in this
//! struct: these values tune *detection*, the rule table decides
//! *consequences*.

/// Tunable settings for the engine and the bundled detectors
///
/// Defaults are calibrated for a vanilla-speed survival server; raising the
/// movement ceilings loosens detection, lowering them invites false flags.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Master switch for automated escalation
    ///
    /// When false, violations are still counted and persisted but no
    /// enforcement action ever fires. Useful for shadow-mode rollouts.
    pub enable_automod: bool,

    // === MOVEMENT DETECTION ===
    /// Maximum allowed horizontal speed in blocks per second
    ///
    /// Vanilla sprinting tops out around 5.6 bps; 7.0 leaves headroom for
    /// sprint-jumping on ice without flagging.
    pub max_horizontal_speed_bps: f64,

    /// Extra allowance per level of a speed-boosting effect, in bps
    pub speed_effect_bonus_bps: f64,

    /// Flat tolerance added on top of all speed ceilings, in bps
    ///
    /// Absorbs server-side position jitter. Keep small: this buffer is
    /// granted to every player on every tick.
    pub speed_tolerance_bps: f64,

    /// Consecutive off-ground ticks with near-zero vertical motion before
    /// hovering is reported
    pub hover_tick_threshold: u32,

    /// Minimum fall distance (blocks) where landing without damage is
    /// suspicious
    pub min_no_fall_distance: f64,

    // === CHAT DETECTION ===
    /// Minimum interval between chat messages in milliseconds
    pub fast_message_threshold_ms: u64,

    /// Longest allowed run of one repeated character in a message
    pub char_repeat_threshold: usize,

    /// Messages shorter than this are exempt from the caps check
    pub caps_min_length: usize,

    /// Fraction of uppercase letters (0..1) above which a message counts as
    /// caps abuse
    pub caps_max_ratio: f64,

    // === WORLD DETECTION ===
    /// Sliding window for block-break rate measurement, in milliseconds
    pub break_window_ms: u64,

    /// Block breaks within one window before the nuker check reports
    pub break_window_max_blocks: usize,

    /// Item identifiers that may never be used by non-admin players
    pub banned_items: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_automod: true,

            // Movement
            max_horizontal_speed_bps: 7.0,
            speed_effect_bonus_bps: 2.0,
            speed_tolerance_bps: 0.5,
            hover_tick_threshold: 40,
            min_no_fall_distance: 4.0,

            // Chat
            fast_message_threshold_ms: 500,
            char_repeat_threshold: 8,
            caps_min_length: 10,
            caps_max_ratio: 0.8,

            // World
            break_window_ms: 1000,
            break_window_max_blocks: 10,
            banned_items: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.max_horizontal_speed_bps <= 0.0 {
            return Err("max_horizontal_speed_bps must be positive".into());
        }
        if self.speed_tolerance_bps < 0.0 || self.speed_effect_bonus_bps < 0.0 {
            return Err("speed bonuses must not be negative".into());
        }
        if !(0.0..=1.0).contains(&self.caps_max_ratio) {
            return Err(format!(
                "caps_max_ratio ({}) must be within 0.0..=1.0",
                self.caps_max_ratio
            ));
        }
        if self.char_repeat_threshold < 2 {
            return Err("char_repeat_threshold must be at least 2".into());
        }
        if self.break_window_ms == 0 {
            return Err("break_window_ms must be positive".into());
        }
        Ok(())
    }
}
