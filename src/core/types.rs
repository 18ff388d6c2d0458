//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable identifier for a player session.
///
/// Display names can change mid-session (or be spoofed), so every map in the
/// engine is keyed by this id and never by the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A player as seen by the engine: stable id plus the current display name.
///
/// The name is carried only for messages and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerHandle {
    pub id: PlayerId,
    pub name: String,
}

impl PlayerHandle {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Category identifier for a family of violations (e.g. "movement_speed").
///
/// Check types are an open set defined by configuration; detectors and the
/// rule table agree on these strings by convention.
pub type CheckType = String;

/// Free-form key/value payload attached to a single violation report.
///
/// A BTreeMap keeps iteration order stable so formatted detail strings and
/// log lines are deterministic.
pub type ViolationDetails = BTreeMap<String, String>;

/// One detector finding: which check fired and what it measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub check_type: CheckType,
    pub details: ViolationDetails,
}

impl Violation {
    pub fn new(check_type: impl Into<CheckType>) -> Self {
        Self {
            check_type: check_type.into(),
            details: ViolationDetails::new(),
        }
    }

    /// Attach one detail entry, builder style.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}

/// Milliseconds since the unix epoch; the engine's only notion of wall time.
pub type TimestampMs = u64;

/// Current wall-clock time in unix milliseconds.
pub fn now_ms() -> TimestampMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
