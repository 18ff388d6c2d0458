//! Executes one escalation rule against the enforcement collaborators
//!
//! The dispatcher converts every failure (malformed configuration, backend
//! rejection, missing message keys) into an `ActionOutcome`. Nothing here
//! returns an error to the caller: a failed kick must not stop the temp-ban
//! rule queued behind it, and no failure ever unwinds counters.

use crate::core::duration::parse_duration;
use crate::core::types::{PlayerHandle, TimestampMs, ViolationDetails};
use crate::enforcement::backends::{ActionOutcome, Backends, LogEntry};
use crate::enforcement::messages::{format_details, MessageCatalog, MessageContext};
use crate::rules::table::{ActionType, RuleDefinition};
use std::collections::BTreeMap;

pub struct ActionDispatcher {
    backends: Backends,
    messages: MessageCatalog,
}

impl ActionDispatcher {
    pub fn new(backends: Backends, messages: MessageCatalog) -> Self {
        Self { backends, messages }
    }

    /// Run one rule's action and report what happened.
    ///
    /// `flag_count` is the counter value that crossed the rule's threshold;
    /// it only feeds message placeholders. `now` anchors expiry timestamps
    /// for timed punishments.
    pub async fn execute(
        &self,
        player: &PlayerHandle,
        check_type: &str,
        rule: &RuleDefinition,
        flag_count: u32,
        details: &ViolationDetails,
        now: TimestampMs,
    ) -> ActionOutcome {
        let ctx = MessageContext {
            player_name: &player.name,
            check_type,
            duration: rule.duration_param(),
            flag_count,
            flag_threshold: rule.flag_threshold,
            details: Some(details),
        };

        let outcome = self.attempt(player, check_type, rule, &ctx, now).await;
        self.report(player, check_type, rule, details, &outcome).await;
        outcome
    }

    async fn attempt(
        &self,
        player: &PlayerHandle,
        check_type: &str,
        rule: &RuleDefinition,
        ctx: &MessageContext<'_>,
        now: TimestampMs,
    ) -> ActionOutcome {
        let mut applied = rule.params.clone();

        match rule.action {
            ActionType::FlagOnly => ActionOutcome::success(rule.action, applied),

            ActionType::Warn => {
                let text = match self.resolve_required_message(rule, ctx) {
                    Ok(text) => text,
                    Err(reason) => return self.config_failure(rule, check_type, reason, applied),
                };
                match self.backends.messaging.send_to_player(player, &text).await {
                    Ok(()) => ActionOutcome::success(rule.action, applied),
                    Err(e) => ActionOutcome::failure(rule.action, e.to_string(), applied),
                }
            }

            ActionType::Mute => {
                let duration_ms = match self.resolve_finite_duration(rule) {
                    Ok(ms) => ms,
                    Err(reason) => return self.config_failure(rule, check_type, reason, applied),
                };
                let reason = match self.resolve_reason(rule, check_type, ctx) {
                    Ok(reason) => reason,
                    Err(why) => return self.config_failure(rule, check_type, why, applied),
                };
                applied.insert("expiry_ms".into(), (now + duration_ms).to_string());
                match self
                    .backends
                    .mutes
                    .apply_mute(player, &reason, now + duration_ms)
                    .await
                {
                    Ok(()) => ActionOutcome::success(rule.action, applied),
                    Err(e) => ActionOutcome::failure(rule.action, e.to_string(), applied),
                }
            }

            ActionType::Kick => {
                let reason = match self.resolve_reason(rule, check_type, ctx) {
                    Ok(reason) => reason,
                    Err(why) => return self.config_failure(rule, check_type, why, applied),
                };
                match self.backends.sessions.disconnect(player, &reason).await {
                    Ok(()) => ActionOutcome::success(rule.action, applied),
                    Err(e) => ActionOutcome::failure(rule.action, e.to_string(), applied),
                }
            }

            ActionType::Freeze => {
                match self.backends.movement.set_frozen(player, true).await {
                    Ok(()) => ActionOutcome::success(rule.action, applied),
                    Err(e) => ActionOutcome::failure(rule.action, e.to_string(), applied),
                }
            }

            ActionType::TempBan => {
                let duration_ms = match self.resolve_finite_duration(rule) {
                    Ok(ms) => ms,
                    Err(reason) => return self.config_failure(rule, check_type, reason, applied),
                };
                let reason = match self.resolve_reason(rule, check_type, ctx) {
                    Ok(reason) => reason,
                    Err(why) => return self.config_failure(rule, check_type, why, applied),
                };
                applied.insert("expiry_ms".into(), (now + duration_ms).to_string());
                match self
                    .backends
                    .bans
                    .apply_ban(player, &reason, Some(now + duration_ms))
                    .await
                {
                    Ok(()) => ActionOutcome::success(rule.action, applied),
                    Err(e) => ActionOutcome::failure(rule.action, e.to_string(), applied),
                }
            }

            ActionType::PermBan => {
                let reason = match self.resolve_reason(rule, check_type, ctx) {
                    Ok(reason) => reason,
                    Err(why) => return self.config_failure(rule, check_type, why, applied),
                };
                match self.backends.bans.apply_ban(player, &reason, None).await {
                    Ok(()) => ActionOutcome::success(rule.action, applied),
                    Err(e) => ActionOutcome::failure(rule.action, e.to_string(), applied),
                }
            }
        }
    }

    /// Timed punishments need a finite, well-formed duration; anything else
    /// is a configuration error and the action fails closed.
    fn resolve_finite_duration(&self, rule: &RuleDefinition) -> Result<u64, String> {
        let raw = rule
            .duration_param()
            .ok_or_else(|| format!("{} rule has no duration parameter", rule.action))?;
        match parse_duration(raw) {
            Ok(Some(ms)) => Ok(ms),
            Ok(None) => Err(format!(
                "{} rule duration {:?} is permanent; use perm_ban for indefinite bans",
                rule.action, raw
            )),
            Err(_) => Err(format!("{} rule has malformed duration {:?}", rule.action, raw)),
        }
    }

    /// Warn actions must carry a resolvable message key.
    fn resolve_required_message(
        &self,
        rule: &RuleDefinition,
        ctx: &MessageContext<'_>,
    ) -> Result<String, String> {
        let key = rule
            .message_key()
            .ok_or_else(|| "warn rule has no message_key parameter".to_string())?;
        self.messages
            .format(key, ctx)
            .ok_or_else(|| format!("message key {:?} is not in the catalog", key))
    }

    /// A configured reason key must resolve; with no key at all, fall back
    /// to a generated reason so kicks and bans always carry one.
    fn resolve_reason(
        &self,
        rule: &RuleDefinition,
        check_type: &str,
        ctx: &MessageContext<'_>,
    ) -> Result<String, String> {
        match rule.reason_key() {
            Some(key) => self
                .messages
                .format(key, ctx)
                .ok_or_else(|| format!("reason key {:?} is not in the catalog", key)),
            None => Ok(format!(
                "Automated enforcement: {} ({}/{})",
                check_type, ctx.flag_count, rule.flag_threshold
            )),
        }
    }

    fn config_failure(
        &self,
        rule: &RuleDefinition,
        check_type: &str,
        reason: String,
        applied: BTreeMap<String, String>,
    ) -> ActionOutcome {
        tracing::warn!(
            check_type,
            action = %rule.action,
            threshold = rule.flag_threshold,
            %reason,
            "action failed closed on configuration error"
        );
        ActionOutcome::failure(rule.action, format!("configuration error: {}", reason), applied)
    }

    /// Audit fan-out: every attempt produces a log entry; failures also go
    /// to the admin channel so silent enforcement gaps stay visible.
    async fn report(
        &self,
        player: &PlayerHandle,
        check_type: &str,
        rule: &RuleDefinition,
        details: &ViolationDetails,
        outcome: &ActionOutcome,
    ) {
        let status = if outcome.succeeded { "applied" } else { "failed" };
        self.backends.log.record(LogEntry {
            action: format!("automod_{}", rule.action),
            target: player.name.clone(),
            details: format_details(details),
            reason: format!(
                "{} {} at threshold {} for {}{}",
                status,
                rule.action,
                rule.flag_threshold,
                check_type,
                outcome
                    .error_reason
                    .as_deref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            ),
        });

        let note = format!(
            "[automod] {} {} for {} on {} (threshold {})",
            rule.action, status, player.name, check_type, rule.flag_threshold
        );
        if let Err(e) = self.backends.notifications.notify_admins(&note).await {
            tracing::debug!(error = %e, "admin notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{Result as WResult, WardenError};
    use crate::enforcement::backends::{
        BanBackend, LogBackend, MessagingBackend, MovementLockBackend, MuteBackend,
        NotificationBackend, SessionBackend,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every call; individual channels can be told to fail.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail_disconnect: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl BanBackend for Recorder {
        async fn apply_ban(
            &self,
            player: &PlayerHandle,
            reason: &str,
            expiry_ms: Option<TimestampMs>,
        ) -> WResult<()> {
            self.push(format!("ban {} {:?} {}", player.name, expiry_ms, reason));
            Ok(())
        }
    }

    #[async_trait]
    impl MuteBackend for Recorder {
        async fn apply_mute(
            &self,
            player: &PlayerHandle,
            reason: &str,
            expiry_ms: TimestampMs,
        ) -> WResult<()> {
            self.push(format!("mute {} {} {}", player.name, expiry_ms, reason));
            Ok(())
        }
    }

    #[async_trait]
    impl SessionBackend for Recorder {
        async fn disconnect(&self, player: &PlayerHandle, reason: &str) -> WResult<()> {
            if self.fail_disconnect {
                return Err(WardenError::Backend("player already disconnected".into()));
            }
            self.push(format!("kick {} {}", player.name, reason));
            Ok(())
        }
    }

    #[async_trait]
    impl MovementLockBackend for Recorder {
        async fn set_frozen(&self, player: &PlayerHandle, frozen: bool) -> WResult<()> {
            self.push(format!("freeze {} {}", player.name, frozen));
            Ok(())
        }
    }

    #[async_trait]
    impl MessagingBackend for Recorder {
        async fn send_to_player(&self, player: &PlayerHandle, text: &str) -> WResult<()> {
            self.push(format!("msg {} {}", player.name, text));
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationBackend for Recorder {
        async fn notify_admins(&self, text: &str) -> WResult<()> {
            self.push(format!("notify {}", text));
            Ok(())
        }
    }

    impl LogBackend for Recorder {
        fn record(&self, entry: LogEntry) {
            self.push(format!("log {} {}", entry.action, entry.reason));
        }
    }

    fn dispatcher_with(recorder: Arc<Recorder>) -> ActionDispatcher {
        let mut messages = MessageCatalog::new();
        messages.insert("warn.speed", "{playerName}: slow down ({flagCount}/{flagThreshold})");
        messages.insert("reason.speed", "Speeding on {checkType}");
        let backends = Backends {
            bans: recorder.clone(),
            mutes: recorder.clone(),
            sessions: recorder.clone(),
            movement: recorder.clone(),
            messaging: recorder.clone(),
            notifications: recorder.clone(),
            log: recorder,
        };
        ActionDispatcher::new(backends, messages)
    }

    fn player() -> PlayerHandle {
        PlayerHandle::new(crate::core::types::PlayerId::new(), "Steve")
    }

    #[tokio::test]
    async fn test_warn_sends_formatted_message() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(2, ActionType::Warn).with_param("message_key", "warn.speed");

        let outcome = dispatcher
            .execute(&player(), "movement_speed", &rule, 2, &ViolationDetails::new(), 1_000)
            .await;

        assert!(outcome.succeeded);
        let calls = recorder.calls();
        assert!(calls.iter().any(|c| c == "msg Steve Steve: slow down (2/2)"));
    }

    #[tokio::test]
    async fn test_warn_without_message_key_fails_closed() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(2, ActionType::Warn);

        let outcome = dispatcher
            .execute(&player(), "movement_speed", &rule, 2, &ViolationDetails::new(), 1_000)
            .await;

        assert!(!outcome.succeeded);
        assert!(outcome.error_reason.unwrap().contains("configuration error"));
        // No message was sent.
        assert!(!recorder.calls().iter().any(|c| c.starts_with("msg")));
    }

    #[tokio::test]
    async fn test_temp_ban_uses_parsed_duration() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(6, ActionType::TempBan)
            .with_param("duration", "30m")
            .with_param("reason_key", "reason.speed");

        let outcome = dispatcher
            .execute(&player(), "movement_speed", &rule, 6, &ViolationDetails::new(), 1_000)
            .await;

        assert!(outcome.succeeded);
        // 1_000 + 30 minutes.
        let expiry = 1_000 + 30 * 60 * 1000;
        assert!(recorder
            .calls()
            .iter()
            .any(|c| c == &format!("ban Steve Some({}) Speeding on movement_speed", expiry)));
        assert_eq!(
            outcome.applied_params.get("expiry_ms").map(String::as_str),
            Some(expiry.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_temp_ban_malformed_duration_fails_closed() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(6, ActionType::TempBan).with_param("duration", "soon");

        let outcome = dispatcher
            .execute(&player(), "movement_speed", &rule, 6, &ViolationDetails::new(), 1_000)
            .await;

        assert!(!outcome.succeeded);
        assert!(!recorder.calls().iter().any(|c| c.starts_with("ban")));
    }

    #[tokio::test]
    async fn test_mute_requires_duration() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(5, ActionType::Mute);

        let outcome = dispatcher
            .execute(&player(), "chat_spam_fast", &rule, 5, &ViolationDetails::new(), 1_000)
            .await;

        assert!(!outcome.succeeded);
        assert!(!recorder.calls().iter().any(|c| c.starts_with("mute")));
    }

    #[tokio::test]
    async fn test_perm_ban_without_reason_key_gets_generated_reason() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(10, ActionType::PermBan);

        let outcome = dispatcher
            .execute(&player(), "combat_reach", &rule, 10, &ViolationDetails::new(), 1_000)
            .await;

        assert!(outcome.succeeded);
        assert!(recorder
            .calls()
            .iter()
            .any(|c| c == "ban Steve None Automated enforcement: combat_reach (10/10)"));
    }

    #[tokio::test]
    async fn test_backend_failure_is_recorded_not_raised() {
        let recorder = Arc::new(Recorder {
            fail_disconnect: true,
            ..Default::default()
        });
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(4, ActionType::Kick);

        let outcome = dispatcher
            .execute(&player(), "movement_speed", &rule, 4, &ViolationDetails::new(), 1_000)
            .await;

        assert!(!outcome.succeeded);
        assert!(outcome.error_reason.unwrap().contains("already disconnected"));
        // The failure still produced an audit entry.
        assert!(recorder.calls().iter().any(|c| c.starts_with("log automod_kick")));
    }

    #[tokio::test]
    async fn test_flag_only_touches_no_enforcement_backend() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(1, ActionType::FlagOnly);

        let outcome = dispatcher
            .execute(&player(), "world_piston_lag", &rule, 1, &ViolationDetails::new(), 1_000)
            .await;

        assert!(outcome.succeeded);
        let calls = recorder.calls();
        // Only the audit trail fired.
        assert!(calls.iter().all(|c| c.starts_with("log") || c.starts_with("notify")));
        assert!(calls.iter().any(|c| c.starts_with("log automod_flag_only")));
    }

    #[tokio::test]
    async fn test_freeze_engages_movement_lock() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher_with(recorder.clone());
        let rule = RuleDefinition::new(1, ActionType::Freeze);

        let outcome = dispatcher
            .execute(&player(), "combat_reach", &rule, 1, &ViolationDetails::new(), 1_000)
            .await;

        assert!(outcome.succeeded);
        assert!(recorder.calls().iter().any(|c| c == "freeze Steve true"));
    }
}
