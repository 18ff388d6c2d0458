//! Violation ingress: the single entry point every detector calls
//!
//! `report` runs the whole pipeline for one violation: count it, decide
//! which escalation tiers newly crossed, dispatch their actions, apply
//! resets, persist, all inside the reporting player's critical section.
//! The host runtime is cooperative: handlers suspend at persistence and
//! backend calls, so two violations for one player can interleave unless the
//! record is locked end-to-end. Different players never contend.

use crate::core::config::EngineConfig;
use crate::core::types::{now_ms, PlayerHandle, PlayerId, TimestampMs, Violation};
use crate::engine::evaluator::evaluate;
use crate::enforcement::backends::Backends;
use crate::enforcement::dispatcher::ActionDispatcher;
use crate::flags::persistence::PersistenceStore;
use crate::flags::store::{FlagStore, PlayerViolationRecord};
use crate::rules::table::RuleTable;
use crate::rules::Policy;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ViolationIngress {
    config: EngineConfig,
    rules: RuleTable,
    store: FlagStore,
    dispatcher: ActionDispatcher,
    persistence: Arc<dyn PersistenceStore>,
}

impl ViolationIngress {
    pub fn new(policy: Policy, backends: Backends, persistence: Arc<dyn PersistenceStore>) -> Self {
        Self {
            config: policy.engine,
            rules: policy.rules,
            store: FlagStore::new(),
            dispatcher: ActionDispatcher::new(backends, policy.messages),
            persistence,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Count one violation and run any escalation it triggers.
    ///
    /// Never returns an error: enforcement and persistence failures are
    /// logged outcomes, invisible to the reporting detector.
    pub async fn report(&self, player: &PlayerHandle, violation: Violation) {
        self.report_at(player, violation, now_ms()).await;
    }

    /// Clock-injected variant of [`report`](Self::report); everything below
    /// the public entry point is deterministic given `now`.
    pub async fn report_at(&self, player: &PlayerHandle, violation: Violation, now: TimestampMs) {
        let check_type = violation.check_type.as_str();
        let rule_set = self.rules.get(check_type);
        let reset_after = rule_set.and_then(|s| s.reset_after_ms);

        let handle = self.record_handle(player.id).await;
        let mut record = handle.lock().await;

        let new_count = record.increment(check_type, now, reset_after);
        tracing::debug!(
            player = %player.name,
            check_type,
            count = new_count,
            "violation counted"
        );

        match rule_set {
            None => {
                // Unknown or unconfigured check type: counted, never punished.
                tracing::debug!(check_type, "no rules configured; silent accumulation");
            }
            Some(set) if !self.config.enable_automod || !set.enabled => {
                tracing::debug!(check_type, "escalation disabled; counted only");
            }
            Some(set) => {
                let counter = record.snapshot(check_type);
                let pending = evaluate(set.rules(), &counter);
                for p in pending {
                    let outcome = self
                        .dispatcher
                        .execute(player, check_type, p.rule, counter.count, &violation.details, now)
                        .await;
                    record.note_applied_rule(check_type, p.index);

                    if !outcome.succeeded {
                        tracing::warn!(
                            player = %player.name,
                            check_type,
                            action = %p.rule.action,
                            reason = outcome.error_reason.as_deref().unwrap_or("unknown"),
                            "enforcement action failed; batch continues"
                        );
                    }

                    if p.rule.reset_flags {
                        // A resetting rule clears the marker and terminates
                        // the batch: later tiers wait for a fresh climb.
                        record.apply_reset(check_type);
                        break;
                    }
                }
            }
        }

        self.flush(player.id, &mut record).await;
    }

    /// Administrative reset: zero every counter for the player.
    pub async fn reset_all(&self, player: PlayerId) {
        let handle = self.record_handle(player).await;
        let mut record = handle.lock().await;
        record.reset_all();
        self.flush(player, &mut record).await;
        tracing::info!(%player, "all violation counters reset");
    }

    /// Read-only snapshot for status and inspection UIs.
    pub async fn get_record(&self, player: PlayerId) -> Option<PlayerViolationRecord> {
        let handle = self.store.get(player)?;
        let record = handle.lock().await;
        Some(record.clone())
    }

    /// Restore a player's history into memory at session start.
    pub async fn player_joined(&self, player: &PlayerHandle) {
        let _ = self.record_handle(player.id).await;
        tracing::debug!(player = %player.name, "violation record resident");
    }

    /// Flush and evict the in-memory record; durable storage keeps the
    /// player's history.
    pub async fn player_left(&self, player: PlayerId) {
        if let Some(handle) = self.store.evict(player) {
            let mut record = handle.lock().await;
            self.flush(player, &mut record).await;
        }
    }

    /// Players with a resident record, for status displays.
    pub fn resident_players(&self) -> Vec<PlayerId> {
        self.store.resident_players()
    }

    /// Record handle for a player, consulting durable storage on first
    /// touch. A load failure starts a fresh record rather than blocking the
    /// session.
    async fn record_handle(&self, player: PlayerId) -> Arc<Mutex<PlayerViolationRecord>> {
        if let Some(handle) = self.store.get(player) {
            return handle;
        }
        match self.persistence.load(player).await {
            Ok(Some(record)) => self.store.restore(player, record),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%player, error = %e, "record load failed; starting fresh");
            }
        }
        self.store.entry(player)
    }

    /// Best-effort write-back. On failure the record stays dirty so the next
    /// event for this player retries; in-memory counts remain authoritative.
    async fn flush(&self, player: PlayerId, record: &mut PlayerViolationRecord) {
        if !record.is_dirty() {
            return;
        }
        match self.persistence.save(player, record).await {
            Ok(()) => record.mark_clean(),
            Err(e) => {
                tracing::warn!(
                    %player,
                    error = %e,
                    "record write failed; counts may diverge from storage until retry"
                );
            }
        }
    }
}
