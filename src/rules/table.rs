//! Escalation rule table
//!
//! Maps each check type to an ordered list of threshold rules. The table is
//! built once at startup and never mutated afterwards, so readers need no
//! locking.

use crate::core::types::CheckType;
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Enforcement action a rule can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Log and notify only; no player-visible consequence
    FlagOnly,
    /// Localized warning message to the player
    Warn,
    /// Timed chat restriction
    Mute,
    /// Immediate disconnect
    Kick,
    /// Immobilize pending manual review; reversed only by an administrator
    Freeze,
    /// Timed ban
    TempBan,
    /// Indefinite ban
    PermBan,
}

impl ActionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "flag_only" => Some(ActionType::FlagOnly),
            "warn" => Some(ActionType::Warn),
            "mute" => Some(ActionType::Mute),
            "kick" => Some(ActionType::Kick),
            "freeze" => Some(ActionType::Freeze),
            "temp_ban" => Some(ActionType::TempBan),
            "perm_ban" => Some(ActionType::PermBan),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionType::FlagOnly => "flag_only",
            ActionType::Warn => "warn",
            ActionType::Mute => "mute",
            ActionType::Kick => "kick",
            ActionType::Freeze => "freeze",
            ActionType::TempBan => "temp_ban",
            ActionType::PermBan => "perm_ban",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One escalation tier: when the counter reaches `flag_threshold`, run
/// `action` with `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    pub flag_threshold: u32,
    pub action: ActionType,
    /// String parameters for the action (e.g. `duration`, `message_key`,
    /// `reason_key`)
    pub params: BTreeMap<String, String>,
    /// Zero the counter after this rule fires; a resetting rule always
    /// terminates its batch
    pub reset_flags: bool,
}

impl RuleDefinition {
    pub fn new(flag_threshold: u32, action: ActionType) -> Self {
        Self {
            flag_threshold,
            action,
            params: BTreeMap::new(),
            reset_flags: true,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_reset(mut self, reset_flags: bool) -> Self {
        self.reset_flags = reset_flags;
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn duration_param(&self) -> Option<&str> {
        self.param("duration")
    }

    pub fn message_key(&self) -> Option<&str> {
        self.param("message_key")
    }

    pub fn reason_key(&self) -> Option<&str> {
        self.param("reason_key")
    }
}

/// All escalation tiers for one check type.
///
/// Rules are held in ascending threshold order; the sort is stable, so rules
/// declared at the same threshold keep their declaration order. That order is
/// the execution order, which lets a configuration put a freeze before the
/// warning message at the same tier.
#[derive(Debug, Clone)]
pub struct CheckRuleSet {
    pub check_type: CheckType,
    /// Disabled sets still accumulate counts but never fire actions
    pub enabled: bool,
    /// Counter is zeroed when a new violation arrives this long after the
    /// previous one
    pub reset_after_ms: Option<u64>,
    rules: Vec<RuleDefinition>,
}

impl CheckRuleSet {
    pub fn new(check_type: impl Into<CheckType>, mut rules: Vec<RuleDefinition>) -> Self {
        rules.sort_by_key(|r| r.flag_threshold);
        Self {
            check_type: check_type.into(),
            enabled: true,
            reset_after_ms: None,
            rules,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_reset_after_ms(mut self, reset_after_ms: Option<u64>) -> Self {
        self.reset_after_ms = reset_after_ms;
        self
    }

    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }
}

/// Immutable check-type to rule-set registry, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    sets: AHashMap<CheckType, CheckRuleSet>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set: CheckRuleSet) {
        self.sets.insert(set.check_type.clone(), set);
    }

    pub fn get(&self, check_type: &str) -> Option<&CheckRuleSet> {
        self.sets.get(check_type)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn check_types(&self) -> impl Iterator<Item = &CheckType> {
        self.sets.keys()
    }
}
