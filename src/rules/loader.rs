//! Load escalation policy from TOML files
//!
//! One policy document carries the engine settings (`[engine]`), the rule
//! table (`[[check]]` with nested `[[check.rule]]`) and the message catalog
//! (`[messages]`).

use crate::core::config::EngineConfig;
use crate::core::duration::parse_duration;
use crate::enforcement::messages::MessageCatalog;
use crate::rules::table::{ActionType, CheckRuleSet, RuleDefinition, RuleTable};
use std::fs;
use std::path::Path;

/// Everything a policy file defines.
#[derive(Debug, Clone)]
pub struct Policy {
    pub engine: EngineConfig,
    pub rules: RuleTable,
    pub messages: MessageCatalog,
}

/// Load a policy from a TOML file on disk.
pub fn load_policy(path: &Path) -> Result<Policy, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_policy(&content)
}

/// Parse a policy from TOML text.
pub fn parse_policy(content: &str) -> Result<Policy, String> {
    let toml: toml::Value = content
        .parse()
        .map_err(|e| format!("Invalid TOML: {}", e))?;

    let engine = parse_engine(&toml)?;
    let mut rules = RuleTable::new();
    if let Some(checks) = toml.get("check").and_then(|v| v.as_array()) {
        for check in checks {
            rules.insert(parse_check(check)?);
        }
    }

    let mut messages = MessageCatalog::new();
    if let Some(table) = toml.get("messages").and_then(|v| v.as_table()) {
        for (key, value) in table {
            let template = value
                .as_str()
                .ok_or_else(|| format!("messages.{}: template must be a string", key))?;
            messages.insert(key.clone(), template);
        }
    }

    Ok(Policy {
        engine,
        rules,
        messages,
    })
}

fn parse_engine(toml: &toml::Value) -> Result<EngineConfig, String> {
    let mut config = EngineConfig::default();

    if let Some(table) = toml.get("engine").and_then(|v| v.as_table()) {
        if let Some(v) = table.get("enable_automod").and_then(|v| v.as_bool()) {
            config.enable_automod = v;
        }
        if let Some(v) = table.get("max_horizontal_speed_bps").and_then(|v| v.as_float()) {
            config.max_horizontal_speed_bps = v;
        }
        if let Some(v) = table.get("speed_effect_bonus_bps").and_then(|v| v.as_float()) {
            config.speed_effect_bonus_bps = v;
        }
        if let Some(v) = table.get("speed_tolerance_bps").and_then(|v| v.as_float()) {
            config.speed_tolerance_bps = v;
        }
        if let Some(v) = table.get("hover_tick_threshold").and_then(|v| v.as_integer()) {
            config.hover_tick_threshold = v as u32;
        }
        if let Some(v) = table.get("min_no_fall_distance").and_then(|v| v.as_float()) {
            config.min_no_fall_distance = v;
        }
        if let Some(v) = table.get("fast_message_threshold_ms").and_then(|v| v.as_integer()) {
            config.fast_message_threshold_ms = v as u64;
        }
        if let Some(v) = table.get("char_repeat_threshold").and_then(|v| v.as_integer()) {
            config.char_repeat_threshold = v as usize;
        }
        if let Some(v) = table.get("caps_min_length").and_then(|v| v.as_integer()) {
            config.caps_min_length = v as usize;
        }
        if let Some(v) = table.get("caps_max_ratio").and_then(|v| v.as_float()) {
            config.caps_max_ratio = v;
        }
        if let Some(v) = table.get("break_window_ms").and_then(|v| v.as_integer()) {
            config.break_window_ms = v as u64;
        }
        if let Some(v) = table.get("break_window_max_blocks").and_then(|v| v.as_integer()) {
            config.break_window_max_blocks = v as usize;
        }
        if let Some(items) = table.get("banned_items").and_then(|v| v.as_array()) {
            config.banned_items = items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect();
        }
    }

    config.validate()?;
    Ok(config)
}

fn parse_check(value: &toml::Value) -> Result<CheckRuleSet, String> {
    let check_type = value
        .get("check_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "check missing check_type".to_string())?
        .to_string();

    let enabled = value
        .get("enabled")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    let reset_after_ms = match value.get("reset_after").and_then(|v| v.as_str()) {
        Some(s) => Some(
            parse_duration(s)
                .map_err(|_| format!("{}: invalid reset_after '{}'", check_type, s))?
                .ok_or_else(|| format!("{}: reset_after cannot be permanent", check_type))?,
        ),
        None => None,
    };

    let mut rules = Vec::new();
    if let Some(rule_values) = value.get("rule").and_then(|v| v.as_array()) {
        for rule_value in rule_values {
            rules.push(parse_rule(rule_value, &check_type)?);
        }
    }

    Ok(CheckRuleSet::new(check_type, rules)
        .with_enabled(enabled)
        .with_reset_after_ms(reset_after_ms))
}

fn parse_rule(value: &toml::Value, check_type: &str) -> Result<RuleDefinition, String> {
    let threshold = value
        .get("flag_threshold")
        .and_then(|v| v.as_integer())
        .ok_or_else(|| format!("{}: rule missing flag_threshold", check_type))?;
    if threshold < 1 {
        return Err(format!(
            "{}: flag_threshold must be at least 1, got {}",
            check_type, threshold
        ));
    }

    let action_str = value
        .get("action")
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("{}: rule missing action", check_type))?;
    let action = ActionType::parse(action_str)
        .ok_or_else(|| format!("{}: unknown action '{}'", check_type, action_str))?;

    let reset_flags = value
        .get("reset_flags")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    let mut rule = RuleDefinition::new(threshold as u32, action).with_reset(reset_flags);

    // Duration strings are deliberately NOT validated here: a malformed
    // duration fails closed at dispatch time as a configuration error.
    for key in ["duration", "message_key", "reason_key"] {
        if let Some(v) = value.get(key).and_then(|v| v.as_str()) {
            rule = rule.with_param(key, v);
        }
    }

    Ok(rule)
}
