//! Warden - Entry Point
//!
//! Interactive console that drives the escalation engine against a simulated
//! server session. Enforcement lands in in-process backends wired to a
//! punishment ledger, so the whole warn/kick/ban ladder can be exercised
//! from the keyboard.

use warden::core::error::Result;
use warden::core::types::{now_ms, PlayerHandle, PlayerId, Violation};
use warden::detectors::chat;
use warden::enforcement::{
    Backends, BanBackend, MessagingBackend, MovementLockBackend, MuteBackend,
    NotificationBackend, Punishment, PunishmentKind, PunishmentLedger, SessionBackend,
    TracingLog,
};
use warden::engine::ViolationIngress;
use warden::flags::MemoryStore;
use warden::rules::{load_policy, parse_policy, Policy};

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

/// Built-in policy used when no policy.toml is present.
const DEFAULT_POLICY: &str = r#"
[engine]
enable_automod = true
banned_items = ["server:unobtainable_core"]

[[check]]
check_type = "movement_speed"
reset_after = "10m"

[[check.rule]]
flag_threshold = 15
action = "warn"
message_key = "automod.speed.warn"
reset_flags = false

[[check.rule]]
flag_threshold = 25
action = "kick"
reason_key = "automod.speed.kick"
reset_flags = false

[[check.rule]]
flag_threshold = 35
action = "temp_ban"
duration = "5m"
reason_key = "automod.speed.ban"

[[check]]
check_type = "chat_spam_fast"

[[check.rule]]
flag_threshold = 5
action = "warn"
message_key = "automod.spam.warn"
reset_flags = false

[[check.rule]]
flag_threshold = 10
action = "mute"
duration = "5m"
reason_key = "automod.spam.mute"

[[check]]
check_type = "chat_caps_abuse"

[[check.rule]]
flag_threshold = 3
action = "warn"
message_key = "automod.caps.warn"
reset_flags = false

[[check]]
check_type = "combat_reach"

[[check.rule]]
flag_threshold = 1
action = "freeze"
reset_flags = false

[[check.rule]]
flag_threshold = 1
action = "warn"
message_key = "automod.reach.warn"
reset_flags = false

[[check.rule]]
flag_threshold = 3
action = "kick"
reason_key = "automod.reach.kick"

[[check]]
check_type = "world_illegal_item"

[[check.rule]]
flag_threshold = 6
action = "warn"
message_key = "automod.item.warn"
reset_flags = false

[[check.rule]]
flag_threshold = 12
action = "perm_ban"
reason_key = "automod.item.ban"

[messages]
"automod.speed.warn" = "{playerName}, excessive speed detected ({flagCount}/{flagThreshold}). Please play fairly."
"automod.speed.kick" = "Kicked for repeated speed violations."
"automod.speed.ban" = "Banned {duration} for persistent speed violations."
"automod.spam.warn" = "{playerName}, please slow down in chat ({flagCount}/{flagThreshold})."
"automod.spam.mute" = "Muted {duration} for chat spam."
"automod.caps.warn" = "{playerName}, please stop shouting."
"automod.reach.warn" = "{playerName}, you are frozen pending review."
"automod.reach.kick" = "Kicked for repeated reach violations."
"automod.item.warn" = "{playerName}, that item is not allowed ({item_id})."
"automod.item.ban" = "Banned for repeated use of illegal items."
"#;

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("warden=info")
        .init();

    tracing::info!("Warden starting...");

    let rt = Runtime::new()?;

    let policy = load_startup_policy();
    let ledger = Arc::new(PunishmentLedger::new());
    let sim = Arc::new(SimBackends::new(ledger.clone()));
    let backends = Backends {
        bans: sim.clone(),
        mutes: sim.clone(),
        sessions: sim.clone(),
        movement: sim.clone(),
        messaging: sim.clone(),
        notifications: sim.clone(),
        log: Arc::new(TracingLog),
    };
    let engine = ViolationIngress::new(policy, backends, Arc::new(MemoryStore::new()));

    let mut roster: AHashMap<String, PlayerHandle> = AHashMap::new();
    let mut last_chat: AHashMap<PlayerId, u64> = AHashMap::new();

    println!("\n=== WARDEN ===");
    println!("Automated moderation engine, simulated session");
    println!();
    println!("Commands:");
    println!("  report <player> <check> [n]  - Report n violations (default 1)");
    println!("  chat <player> <message>      - Run chat detectors on a message");
    println!("  status                       - Show counters and punishments");
    println!("  reset <player>               - Zero a player's counters");
    println!("  storm <player> <n>           - Random violations across checks");
    println!("  quit / q                     - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "q" {
            break;
        }

        if input == "status" {
            rt.block_on(display_status(&engine, &roster, &ledger));
            continue;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        match parts.as_slice() {
            ["report", name, check] => {
                let player = player_for(&mut roster, name);
                rt.block_on(engine.report(&player, Violation::new(*check)));
            }
            ["report", name, check, n] => match n.parse::<u32>() {
                Ok(n) => {
                    let player = player_for(&mut roster, name);
                    for _ in 0..n {
                        rt.block_on(engine.report(&player, Violation::new(*check)));
                    }
                    println!("Reported {} x {}", n, check);
                }
                Err(_) => println!("Usage: report <player> <check> [n]"),
            },
            ["chat", name, rest @ ..] if !rest.is_empty() => {
                let player = player_for(&mut roster, name);
                let message = rest.join(" ");
                rt.block_on(run_chat_checks(&engine, &player, &message, &mut last_chat));
            }
            ["reset", name] => {
                let player = player_for(&mut roster, name);
                rt.block_on(engine.reset_all(player.id));
                println!("Counters reset for {}", name);
            }
            ["storm", name, n] => match n.parse::<u32>() {
                Ok(n) => {
                    let player = player_for(&mut roster, name);
                    rt.block_on(run_storm(&engine, &player, n));
                }
                Err(_) => println!("Usage: storm <player> <n>"),
            },
            _ => println!("Unknown command. Available: report, chat, status, reset, storm, quit"),
        }
    }

    println!("\nGoodbye! {} player(s) tracked this session.", roster.len());
    Ok(())
}

fn load_startup_policy() -> Policy {
    let path = Path::new("policy.toml");
    if path.exists() {
        match load_policy(path) {
            Ok(policy) => {
                tracing::info!(checks = policy.rules.len(), "loaded policy.toml");
                return policy;
            }
            Err(e) => {
                tracing::warn!(error = %e, "policy.toml invalid, using built-in policy");
            }
        }
    }
    parse_policy(DEFAULT_POLICY).expect("built-in policy must parse")
}

fn player_for(roster: &mut AHashMap<String, PlayerHandle>, name: &str) -> PlayerHandle {
    roster
        .entry(name.to_string())
        .or_insert_with(|| {
            let handle = PlayerHandle::new(PlayerId::new(), name);
            println!("Joined: {} ({})", name, handle.id);
            handle
        })
        .clone()
}

/// Run every chat detector over one message and report the findings.
async fn run_chat_checks(
    engine: &ViolationIngress,
    player: &PlayerHandle,
    message: &str,
    last_chat: &mut AHashMap<PlayerId, u64>,
) {
    let config = engine.config().clone();
    let now = now_ms();
    let previous = last_chat.insert(player.id, now);

    let findings = [
        chat::check_message_rate(&config, previous, now),
        chat::check_char_repeat(&config, message),
        chat::check_caps_abuse(&config, message),
    ];

    let mut reported = 0;
    for violation in findings.into_iter().flatten() {
        println!("Detected: {}", violation.check_type);
        engine.report(player, violation).await;
        reported += 1;
    }
    if reported == 0 {
        println!("Message clean.");
    }
}

/// Fire n random violations across the configured check types.
async fn run_storm(engine: &ViolationIngress, player: &PlayerHandle, n: u32) {
    let checks: Vec<String> = engine.rules().check_types().cloned().collect();
    if checks.is_empty() {
        println!("No checks configured.");
        return;
    }

    for _ in 0..n {
        let check = checks
            .choose(&mut rand::thread_rng())
            .expect("non-empty check list")
            .clone();
        engine.report(player, Violation::new(check)).await;
    }
    println!("Storm of {} violations complete.", n);
}

async fn display_status(
    engine: &ViolationIngress,
    roster: &AHashMap<String, PlayerHandle>,
    ledger: &PunishmentLedger,
) {
    if roster.is_empty() {
        println!("No players yet.");
        return;
    }

    let now = now_ms();
    for (name, handle) in roster {
        println!("{}", name);
        match engine.get_record(handle.id).await {
            Some(record) => {
                println!("  Total flags: {}", record.total_flags);
                for (check, counter) in record.counters() {
                    println!(
                        "  {} - count {}, last applied rule {}",
                        check, counter.count, counter.last_applied_rule
                    );
                }
            }
            None => println!("  No violations recorded."),
        }
        if ledger.is_muted(handle.id, now) {
            println!("  MUTED");
        }
        if ledger.is_banned(handle.id, now) {
            println!("  BANNED");
        }
    }
}

/// In-process enforcement: prints what a real server would do and keeps
/// mutes/bans in the punishment ledger.
struct SimBackends {
    ledger: Arc<PunishmentLedger>,
    frozen: Mutex<AHashSet<PlayerId>>,
}

impl SimBackends {
    fn new(ledger: Arc<PunishmentLedger>) -> Self {
        Self {
            ledger,
            frozen: Mutex::new(AHashSet::new()),
        }
    }
}

#[async_trait]
impl BanBackend for SimBackends {
    async fn apply_ban(
        &self,
        player: &PlayerHandle,
        reason: &str,
        expiry_ms: Option<u64>,
    ) -> Result<()> {
        self.ledger.apply(
            player.id,
            Punishment {
                kind: PunishmentKind::Ban,
                expires_ms: expiry_ms,
                reason: reason.to_string(),
            },
        );
        match expiry_ms {
            Some(_) => println!("[ban] {} temporarily banned: {}", player.name, reason),
            None => println!("[ban] {} permanently banned: {}", player.name, reason),
        }
        Ok(())
    }
}

#[async_trait]
impl MuteBackend for SimBackends {
    async fn apply_mute(&self, player: &PlayerHandle, reason: &str, expiry_ms: u64) -> Result<()> {
        self.ledger.apply(
            player.id,
            Punishment {
                kind: PunishmentKind::Mute,
                expires_ms: Some(expiry_ms),
                reason: reason.to_string(),
            },
        );
        println!("[mute] {} muted: {}", player.name, reason);
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for SimBackends {
    async fn disconnect(&self, player: &PlayerHandle, reason: &str) -> Result<()> {
        println!("[kick] {} disconnected: {}", player.name, reason);
        Ok(())
    }
}

#[async_trait]
impl MovementLockBackend for SimBackends {
    async fn set_frozen(&self, player: &PlayerHandle, frozen: bool) -> Result<()> {
        let mut set = self.frozen.lock().expect("frozen set lock poisoned");
        if frozen {
            set.insert(player.id);
        } else {
            set.remove(&player.id);
        }
        println!("[freeze] {} frozen = {}", player.name, frozen);
        Ok(())
    }
}

#[async_trait]
impl MessagingBackend for SimBackends {
    async fn send_to_player(&self, player: &PlayerHandle, text: &str) -> Result<()> {
        println!("[msg -> {}] {}", player.name, text);
        Ok(())
    }
}

#[async_trait]
impl NotificationBackend for SimBackends {
    async fn notify_admins(&self, text: &str) -> Result<()> {
        println!("[admin] {}", text);
        Ok(())
    }
}
