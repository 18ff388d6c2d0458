//! Timed punishment ledger
//!
//! Reference implementation behind the mute/ban backends: a table of active
//! punishments keyed by player and kind, with lazy expiry on lookup. The
//! ledger serializes to JSON so a host can snapshot it periodically and
//! reload it at startup.

use crate::core::error::Result;
use crate::core::types::{PlayerId, TimestampMs};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PunishmentKind {
    Mute,
    Ban,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Punishment {
    pub kind: PunishmentKind,
    /// `None` = indefinite
    pub expires_ms: Option<TimestampMs>,
    pub reason: String,
}

impl Punishment {
    pub fn expired(&self, now: TimestampMs) -> bool {
        matches!(self.expires_ms, Some(expiry) if now >= expiry)
    }
}

/// Active punishments for all players. One entry per (player, kind): a new
/// mute replaces the old one rather than stacking.
#[derive(Default)]
pub struct PunishmentLedger {
    entries: Mutex<AHashMap<(PlayerId, PunishmentKind), Punishment>>,
    needs_save: Mutex<bool>,
}

impl PunishmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, player: PlayerId, punishment: Punishment) {
        let mut entries = self.entries.lock().expect("ledger lock poisoned");
        entries.insert((player, punishment.kind), punishment);
        *self.needs_save.lock().expect("ledger lock poisoned") = true;
    }

    /// The player's active punishment of this kind, if any. Expired entries
    /// are removed on the way out.
    pub fn active(
        &self,
        player: PlayerId,
        kind: PunishmentKind,
        now: TimestampMs,
    ) -> Option<Punishment> {
        let mut entries = self.entries.lock().expect("ledger lock poisoned");
        let key = (player, kind);
        match entries.get(&key) {
            Some(p) if p.expired(now) => {
                entries.remove(&key);
                *self.needs_save.lock().expect("ledger lock poisoned") = true;
                None
            }
            Some(p) => Some(p.clone()),
            None => None,
        }
    }

    /// Administrative lift (unmute / unban). Returns whether an entry was
    /// removed.
    pub fn lift(&self, player: PlayerId, kind: PunishmentKind) -> bool {
        let mut entries = self.entries.lock().expect("ledger lock poisoned");
        let removed = entries.remove(&(player, kind)).is_some();
        if removed {
            *self.needs_save.lock().expect("ledger lock poisoned") = true;
        }
        removed
    }

    pub fn is_muted(&self, player: PlayerId, now: TimestampMs) -> bool {
        self.active(player, PunishmentKind::Mute, now).is_some()
    }

    pub fn is_banned(&self, player: PlayerId, now: TimestampMs) -> bool {
        self.active(player, PunishmentKind::Ban, now).is_some()
    }

    /// Snapshot for durable storage; clears the needs-save marker.
    pub fn to_json(&self) -> Result<String> {
        let entries = self.entries.lock().expect("ledger lock poisoned");
        let list: Vec<(PlayerId, Punishment)> =
            entries.iter().map(|((p, _), pun)| (*p, pun.clone())).collect();
        let json = serde_json::to_string(&list)?;
        *self.needs_save.lock().expect("ledger lock poisoned") = false;
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let list: Vec<(PlayerId, Punishment)> = serde_json::from_str(json)?;
        let ledger = Self::new();
        {
            let mut entries = ledger.entries.lock().expect("ledger lock poisoned");
            for (player, punishment) in list {
                entries.insert((player, punishment.kind), punishment);
            }
        }
        Ok(ledger)
    }

    pub fn needs_save(&self) -> bool {
        *self.needs_save.lock().expect("ledger lock poisoned")
    }
}
