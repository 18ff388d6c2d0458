//! Integration tests for the escalation pipeline
//!
//! These tests drive the full report path (count -> evaluate -> dispatch ->
//! reset -> persist) against recording backends:
//! - threshold ladders fire each tier exactly once, in order
//! - equal thresholds fire together in declaration order
//! - resetting rules zero the counter and terminate the batch
//! - configuration errors fail closed without blocking other checks
//! - records survive disconnect/reconnect through persistence

use warden::core::error::Result;
use warden::core::types::{PlayerHandle, PlayerId, Violation};
use warden::enforcement::{
    Backends, BanBackend, LogBackend, LogEntry, MessagingBackend, MovementLockBackend,
    MuteBackend, NotificationBackend, SessionBackend,
};
use warden::engine::ViolationIngress;
use warden::flags::{MemoryStore, PersistenceStore};
use warden::rules::parse_policy;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Records every enforcement call in arrival order.
#[derive(Default)]
struct RecordingBackends {
    actions: Mutex<Vec<String>>,
}

impl RecordingBackends {
    fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn enforcement_actions(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter(|a| !a.starts_with("log ") && !a.starts_with("notify "))
            .collect()
    }

    fn push(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl BanBackend for RecordingBackends {
    async fn apply_ban(
        &self,
        player: &PlayerHandle,
        reason: &str,
        expiry_ms: Option<u64>,
    ) -> Result<()> {
        match expiry_ms {
            Some(e) => self.push(format!("temp_ban {} until {} ({})", player.name, e, reason)),
            None => self.push(format!("perm_ban {} ({})", player.name, reason)),
        }
        Ok(())
    }
}

#[async_trait]
impl MuteBackend for RecordingBackends {
    async fn apply_mute(&self, player: &PlayerHandle, reason: &str, expiry_ms: u64) -> Result<()> {
        self.push(format!("mute {} until {} ({})", player.name, expiry_ms, reason));
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for RecordingBackends {
    async fn disconnect(&self, player: &PlayerHandle, reason: &str) -> Result<()> {
        self.push(format!("kick {} ({})", player.name, reason));
        Ok(())
    }
}

#[async_trait]
impl MovementLockBackend for RecordingBackends {
    async fn set_frozen(&self, player: &PlayerHandle, frozen: bool) -> Result<()> {
        self.push(format!("freeze {} {}", player.name, frozen));
        Ok(())
    }
}

#[async_trait]
impl MessagingBackend for RecordingBackends {
    async fn send_to_player(&self, player: &PlayerHandle, text: &str) -> Result<()> {
        self.push(format!("warn {} ({})", player.name, text));
        Ok(())
    }
}

#[async_trait]
impl NotificationBackend for RecordingBackends {
    async fn notify_admins(&self, text: &str) -> Result<()> {
        self.push(format!("notify {}", text));
        Ok(())
    }
}

impl LogBackend for RecordingBackends {
    fn record(&self, entry: LogEntry) {
        self.push(format!("log {} {}", entry.action, entry.reason));
    }
}

fn engine_with(policy_toml: &str) -> (ViolationIngress, Arc<RecordingBackends>) {
    let recorder = Arc::new(RecordingBackends::default());
    let backends = Backends {
        bans: recorder.clone(),
        mutes: recorder.clone(),
        sessions: recorder.clone(),
        movement: recorder.clone(),
        messaging: recorder.clone(),
        notifications: recorder.clone(),
        log: recorder.clone(),
    };
    let policy = parse_policy(policy_toml).expect("test policy must parse");
    let engine = ViolationIngress::new(policy, backends, Arc::new(MemoryStore::new()));
    (engine, recorder)
}

fn player(name: &str) -> PlayerHandle {
    PlayerHandle::new(PlayerId::new(), name)
}

// ============================================================================
// Scenario A: three-tier ladder fires each tier once, in order
// ============================================================================

const LADDER_POLICY: &str = r#"
[[check]]
check_type = "movement_speed"

[[check.rule]]
flag_threshold = 2
action = "warn"
message_key = "warn.speed"
reset_flags = false

[[check.rule]]
flag_threshold = 4
action = "kick"
reset_flags = false

[[check.rule]]
flag_threshold = 6
action = "temp_ban"
duration = "30m"
reset_flags = false

[messages]
"warn.speed" = "slow down"
"#;

#[tokio::test]
async fn test_ladder_fires_each_tier_once_in_order() {
    let (engine, recorder) = engine_with(LADDER_POLICY);
    let steve = player("Steve");

    for _ in 0..6 {
        engine.report(&steve, Violation::new("movement_speed")).await;
    }

    let actions = recorder.enforcement_actions();
    assert_eq!(actions.len(), 3, "exactly one action per tier: {:?}", actions);
    assert!(actions[0].starts_with("warn Steve"));
    assert!(actions[1].starts_with("kick Steve"));
    assert!(actions[2].starts_with("temp_ban Steve"));

    // The temp ban carries the parsed 30m duration relative to dispatch time.
    assert!(actions[2].contains("until"));

    let record = engine.get_record(steve.id).await.unwrap();
    assert_eq!(record.snapshot("movement_speed").count, 6);
    assert_eq!(record.snapshot("movement_speed").last_applied_rule, 2);
}

#[tokio::test]
async fn test_tier_never_refires_without_reset() {
    let (engine, recorder) = engine_with(LADDER_POLICY);
    let steve = player("Steve");

    // Push far past every threshold.
    for _ in 0..20 {
        engine.report(&steve, Violation::new("movement_speed")).await;
    }

    assert_eq!(recorder.enforcement_actions().len(), 3);
}

// ============================================================================
// Scenario B: equal thresholds fire together; a resetting rule ends the batch
// ============================================================================

const REACH_POLICY: &str = r#"
[[check]]
check_type = "combat_reach"

[[check.rule]]
flag_threshold = 1
action = "freeze"
reset_flags = false

[[check.rule]]
flag_threshold = 1
action = "warn"
message_key = "warn.reach"
reset_flags = false

[[check.rule]]
flag_threshold = 3
action = "kick"
reset_flags = true

[messages]
"warn.reach" = "frozen pending review"
"#;

#[tokio::test]
async fn test_equal_thresholds_fire_in_declaration_order() {
    let (engine, recorder) = engine_with(REACH_POLICY);
    let alex = player("Alex");

    engine.report(&alex, Violation::new("combat_reach")).await;

    let actions = recorder.enforcement_actions();
    assert_eq!(actions.len(), 2, "{:?}", actions);
    assert!(actions[0].starts_with("freeze Alex true"));
    assert!(actions[1].starts_with("warn Alex"));

    let record = engine.get_record(alex.id).await.unwrap();
    let counter = record.snapshot("combat_reach");
    assert_eq!(counter.count, 1);
    assert_eq!(counter.last_applied_rule, 1);
}

#[tokio::test]
async fn test_resetting_rule_zeroes_counter_and_marker() {
    let (engine, recorder) = engine_with(REACH_POLICY);
    let alex = player("Alex");

    for _ in 0..3 {
        engine.report(&alex, Violation::new("combat_reach")).await;
    }

    let actions = recorder.enforcement_actions();
    assert_eq!(actions.len(), 3, "{:?}", actions);
    assert!(actions[2].starts_with("kick Alex"));

    let record = engine.get_record(alex.id).await.unwrap();
    let counter = record.snapshot("combat_reach");
    assert_eq!(counter.count, 0);
    assert_eq!(counter.last_applied_rule, -1);
    // Lifetime bookkeeping is untouched by the reset.
    assert_eq!(record.total_flags, 3);
}

#[tokio::test]
async fn test_ladder_restarts_after_reset() {
    let (engine, recorder) = engine_with(REACH_POLICY);
    let alex = player("Alex");

    // Two full climbs: freeze+warn at 1, kick+reset at 3, then again.
    for _ in 0..6 {
        engine.report(&alex, Violation::new("combat_reach")).await;
    }

    let actions = recorder.enforcement_actions();
    let kicks = actions.iter().filter(|a| a.starts_with("kick")).count();
    let freezes = actions.iter().filter(|a| a.starts_with("freeze")).count();
    assert_eq!(kicks, 2);
    assert_eq!(freezes, 2);
}

// ============================================================================
// Scenario C: unconfigured check types accumulate silently
// ============================================================================

#[tokio::test]
async fn test_unconfigured_check_counts_without_actions() {
    let (engine, recorder) = engine_with(LADDER_POLICY);
    let casey = player("Casey");

    for _ in 0..10 {
        engine.report(&casey, Violation::new("chat_gibberish")).await;
    }

    assert!(recorder.enforcement_actions().is_empty());
    let record = engine.get_record(casey.id).await.unwrap();
    assert_eq!(record.snapshot("chat_gibberish").count, 10);
}

// ============================================================================
// Scenario D: malformed duration fails closed without collateral damage
// ============================================================================

const BROKEN_DURATION_POLICY: &str = r#"
[[check]]
check_type = "movement_fly_hover"

[[check.rule]]
flag_threshold = 1
action = "temp_ban"
duration = "not-a-duration"
reset_flags = false

[[check]]
check_type = "chat_spam_fast"

[[check.rule]]
flag_threshold = 1
action = "warn"
message_key = "warn.spam"
reset_flags = false

[messages]
"warn.spam" = "slow down in chat"
"#;

#[tokio::test]
async fn test_malformed_duration_fails_closed_and_other_checks_still_fire() {
    let (engine, recorder) = engine_with(BROKEN_DURATION_POLICY);
    let drew = player("Drew");

    engine.report(&drew, Violation::new("movement_fly_hover")).await;

    // No ban was applied; the failure is visible in the audit log.
    let actions = recorder.actions();
    assert!(!actions.iter().any(|a| a.starts_with("temp_ban")));
    assert!(actions
        .iter()
        .any(|a| a.starts_with("log automod_temp_ban failed")));

    // A different check for the same player is unaffected.
    engine.report(&drew, Violation::new("chat_spam_fast")).await;
    assert!(recorder
        .enforcement_actions()
        .iter()
        .any(|a| a.starts_with("warn Drew")));
}

// ============================================================================
// Disabled escalation still counts
// ============================================================================

const DISABLED_POLICY: &str = r#"
[[check]]
check_type = "movement_speed"
enabled = false

[[check.rule]]
flag_threshold = 1
action = "kick"
"#;

#[tokio::test]
async fn test_disabled_check_counts_without_punishing() {
    let (engine, recorder) = engine_with(DISABLED_POLICY);
    let steve = player("Steve");

    for _ in 0..5 {
        engine.report(&steve, Violation::new("movement_speed")).await;
    }

    assert!(recorder.enforcement_actions().is_empty());
    let record = engine.get_record(steve.id).await.unwrap();
    assert_eq!(record.snapshot("movement_speed").count, 5);
}

const MASTER_OFF_POLICY: &str = r#"
[engine]
enable_automod = false

[[check]]
check_type = "movement_speed"

[[check.rule]]
flag_threshold = 1
action = "kick"
"#;

#[tokio::test]
async fn test_master_switch_off_counts_without_punishing() {
    let (engine, recorder) = engine_with(MASTER_OFF_POLICY);
    let steve = player("Steve");

    engine.report(&steve, Violation::new("movement_speed")).await;

    assert!(recorder.enforcement_actions().is_empty());
    assert_eq!(
        engine
            .get_record(steve.id)
            .await
            .unwrap()
            .snapshot("movement_speed")
            .count,
        1
    );
}

// ============================================================================
// Administrative reset reopens the ladder
// ============================================================================

#[tokio::test]
async fn test_reset_all_reopens_every_ladder() {
    let (engine, recorder) = engine_with(LADDER_POLICY);
    let steve = player("Steve");

    for _ in 0..2 {
        engine.report(&steve, Violation::new("movement_speed")).await;
    }
    assert_eq!(recorder.enforcement_actions().len(), 1); // warn at 2

    engine.reset_all(steve.id).await;
    let record = engine.get_record(steve.id).await.unwrap();
    assert_eq!(record.snapshot("movement_speed").count, 0);
    assert_eq!(record.snapshot("movement_speed").last_applied_rule, -1);

    // The warn tier can fire again on a fresh climb.
    for _ in 0..2 {
        engine.report(&steve, Violation::new("movement_speed")).await;
    }
    let warns = recorder
        .enforcement_actions()
        .iter()
        .filter(|a| a.starts_with("warn"))
        .count();
    assert_eq!(warns, 2);
}

// ============================================================================
// Stale counters decay after the configured window
// ============================================================================

const DECAY_POLICY: &str = r#"
[[check]]
check_type = "movement_speed"
reset_after = "10s"

[[check.rule]]
flag_threshold = 2
action = "warn"
message_key = "warn.speed"
reset_flags = false

[messages]
"warn.speed" = "slow down"
"#;

#[tokio::test]
async fn test_stale_counter_resets_after_window() {
    let (engine, recorder) = engine_with(DECAY_POLICY);
    let steve = player("Steve");

    engine
        .report_at(&steve, Violation::new("movement_speed"), 1_000)
        .await;
    engine
        .report_at(&steve, Violation::new("movement_speed"), 2_000)
        .await;
    assert_eq!(recorder.enforcement_actions().len(), 1); // warn at count 2

    // Nearly a minute of good behavior: the counter restarts at 1 and the
    // warn tier is armed again.
    engine
        .report_at(&steve, Violation::new("movement_speed"), 60_000)
        .await;
    let record = engine.get_record(steve.id).await.unwrap();
    assert_eq!(record.snapshot("movement_speed").count, 1);
    assert_eq!(record.snapshot("movement_speed").last_applied_rule, -1);

    engine
        .report_at(&steve, Violation::new("movement_speed"), 61_000)
        .await;
    let warns = recorder
        .enforcement_actions()
        .iter()
        .filter(|a| a.starts_with("warn"))
        .count();
    assert_eq!(warns, 2);
}

// ============================================================================
// Records survive disconnect/reconnect through persistence
// ============================================================================

#[tokio::test]
async fn test_record_survives_reconnect() {
    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(RecordingBackends::default());
    let backends = Backends {
        bans: recorder.clone(),
        mutes: recorder.clone(),
        sessions: recorder.clone(),
        movement: recorder.clone(),
        messaging: recorder.clone(),
        notifications: recorder.clone(),
        log: recorder.clone(),
    };
    let policy = parse_policy(LADDER_POLICY).unwrap();
    let engine = ViolationIngress::new(
        policy,
        backends,
        Arc::clone(&store) as Arc<dyn PersistenceStore>,
    );

    let steve = player("Steve");
    for _ in 0..3 {
        engine.report(&steve, Violation::new("movement_speed")).await;
    }
    // Warn (threshold 2) already applied before disconnect.
    assert_eq!(recorder.enforcement_actions().len(), 1);

    engine.player_left(steve.id).await;
    assert!(engine.get_record(steve.id).await.is_none());

    engine.player_joined(&steve).await;
    let record = engine.get_record(steve.id).await.unwrap();
    let counter = record.snapshot("movement_speed");
    assert_eq!(counter.count, 3);
    // The applied-rule marker persisted: the warn tier must not refire.
    assert_eq!(counter.last_applied_rule, 0);

    engine.report(&steve, Violation::new("movement_speed")).await;
    let actions = recorder.enforcement_actions();
    assert_eq!(actions.len(), 2, "{:?}", actions);
    assert!(actions[1].starts_with("kick Steve"));
}
