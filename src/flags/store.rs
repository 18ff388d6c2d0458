//! Per-player violation counters
//!
//! A `PlayerViolationRecord` is the unit of both locking and persistence:
//! every mutation happens under that player's `tokio::sync::Mutex`, held by
//! the ingress for the whole increment/evaluate/dispatch/persist
//! sequence. The store itself only manages record lifecycle (first touch,
//! restore, eviction); its internal map lock is a plain `std::sync::Mutex`
//! and is never held across an await.

use crate::core::types::{CheckType, PlayerId, TimestampMs};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Running state for one (player, check type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckCounter {
    /// Violations observed since the last reset
    pub count: u32,
    /// When the most recent violation arrived
    pub last_detection_ms: TimestampMs,
    /// Index into the check's rule list of the highest rule already applied;
    /// -1 = none since the last reset
    pub last_applied_rule: i32,
}

impl CheckCounter {
    pub fn new() -> Self {
        Self {
            count: 0,
            last_detection_ms: 0,
            last_applied_rule: -1,
        }
    }
}

impl Default for CheckCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// All violation bookkeeping for one player.
///
/// Owned by the `FlagStore` for the lifetime of the player's session;
/// persisted when dirty; evicted from memory (never from durable storage)
/// after disconnect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerViolationRecord {
    counters: AHashMap<CheckType, CheckCounter>,
    /// Lifetime total of accepted violations, across resets
    pub total_flags: u64,
    #[serde(skip)]
    dirty: bool,
}

impl PlayerViolationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one violation and return the new count.
    ///
    /// When the check is configured with a stale window (`reset_after_ms`)
    /// and the previous violation is older than that window, the counter is
    /// zeroed before the increment so old offenses stop feeding escalation.
    pub fn increment(
        &mut self,
        check_type: &str,
        now: TimestampMs,
        reset_after_ms: Option<u64>,
    ) -> u32 {
        let counter = self
            .counters
            .entry(check_type.to_string())
            .or_insert_with(CheckCounter::new);

        if let Some(window) = reset_after_ms {
            if counter.count > 0 && now.saturating_sub(counter.last_detection_ms) > window {
                tracing::debug!(
                    check_type,
                    stale_count = counter.count,
                    "stale counter reset before increment"
                );
                counter.count = 0;
                counter.last_applied_rule = -1;
            }
        }

        counter.count += 1;
        counter.last_detection_ms = now;
        self.total_flags += 1;
        self.dirty = true;
        counter.count
    }

    /// Read-only view of one counter; absent counters read as zeroed.
    pub fn snapshot(&self, check_type: &str) -> CheckCounter {
        self.counters.get(check_type).copied().unwrap_or_default()
    }

    /// Record that the rule at `index` has been applied for this check.
    pub fn note_applied_rule(&mut self, check_type: &str, index: usize) {
        if let Some(counter) = self.counters.get_mut(check_type) {
            counter.last_applied_rule = index as i32;
            self.dirty = true;
        }
    }

    /// Zero one check's count and applied-rule marker.
    pub fn apply_reset(&mut self, check_type: &str) {
        if let Some(counter) = self.counters.get_mut(check_type) {
            counter.count = 0;
            counter.last_applied_rule = -1;
            self.dirty = true;
        }
    }

    /// Administrative reset: zero every counter.
    pub fn reset_all(&mut self) {
        for counter in self.counters.values_mut() {
            counter.count = 0;
            counter.last_applied_rule = -1;
        }
        self.dirty = true;
    }

    /// Iterate (check type, counter) pairs for inspection UIs.
    pub fn counters(&self) -> impl Iterator<Item = (&CheckType, &CheckCounter)> {
        self.counters.iter()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Record registry keyed by stable player id.
#[derive(Default)]
pub struct FlagStore {
    records: std::sync::Mutex<AHashMap<PlayerId, Arc<Mutex<PlayerViolationRecord>>>>,
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record handle for a player, creating an empty record on
    /// first touch. The returned handle is the player's critical section:
    /// callers lock it before reading or writing.
    pub fn entry(&self, player: PlayerId) -> Arc<Mutex<PlayerViolationRecord>> {
        let mut records = self.records.lock().expect("flag store lock poisoned");
        records
            .entry(player)
            .or_insert_with(|| Arc::new(Mutex::new(PlayerViolationRecord::new())))
            .clone()
    }

    /// Get the record handle without creating one.
    pub fn get(&self, player: PlayerId) -> Option<Arc<Mutex<PlayerViolationRecord>>> {
        let records = self.records.lock().expect("flag store lock poisoned");
        records.get(&player).cloned()
    }

    /// Install a record restored from persistence. Keeps any record that
    /// violations already created in the meantime (first-touch wins so no
    /// counted violation is lost to a slow load).
    pub fn restore(&self, player: PlayerId, record: PlayerViolationRecord) {
        let mut records = self.records.lock().expect("flag store lock poisoned");
        records
            .entry(player)
            .or_insert_with(|| Arc::new(Mutex::new(record)));
    }

    /// Drop a player's record from memory, returning the handle so the
    /// caller can flush it first. Durable storage is untouched.
    pub fn evict(&self, player: PlayerId) -> Option<Arc<Mutex<PlayerViolationRecord>>> {
        let mut records = self.records.lock().expect("flag store lock poisoned");
        records.remove(&player)
    }

    pub fn resident_players(&self) -> Vec<PlayerId> {
        let records = self.records.lock().expect("flag store lock poisoned");
        records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        let records = self.records.lock().expect("flag store lock poisoned");
        records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
