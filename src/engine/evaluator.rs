//! Pure escalation decision function
//!
//! Given a check's rule list and the player's current counter, decide which
//! rules must fire now. No state is touched here: the ingress applies the
//! decisions and records progress.

use crate::flags::store::CheckCounter;
use crate::rules::table::RuleDefinition;

/// A rule due to fire, paired with its position in the rule list so the
/// caller can advance the applied-rule marker.
#[derive(Debug)]
pub struct PendingRule<'a> {
    pub index: usize,
    pub rule: &'a RuleDefinition,
}

/// Collect every rule newly crossed by the counter.
///
/// Scans forward from the rule after `last_applied_rule` while thresholds
/// are within `count`, in list order. Because the list is sorted ascending
/// with declaration order preserved among ties, several rules sharing one
/// threshold all fire on the same crossing, in the order the operator wrote
/// them. A count that jumped past several tiers in one increment still
/// collects every intervening rule.
pub fn evaluate<'a>(rules: &'a [RuleDefinition], counter: &CheckCounter) -> Vec<PendingRule<'a>> {
    let start = (counter.last_applied_rule + 1).max(0) as usize;
    let mut pending = Vec::new();
    for (index, rule) in rules.iter().enumerate().skip(start) {
        if rule.flag_threshold <= counter.count {
            pending.push(PendingRule { index, rule });
        } else {
            break;
        }
    }
    pending
}
