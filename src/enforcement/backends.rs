//! Collaborator seams for enforcement side effects
//!
//! The engine decides *that* an action runs and with what parameters; these
//! traits own the mechanics (networking, session teardown, chat plumbing).
//! Implementations live outside the core: the server embeds real backends,
//! tests and the demo binary use in-process ones.

use crate::core::error::Result;
use crate::core::types::{PlayerHandle, TimestampMs};
use crate::rules::table::ActionType;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait BanBackend: Send + Sync {
    /// `expiry_ms` of `None` means indefinite.
    async fn apply_ban(
        &self,
        player: &PlayerHandle,
        reason: &str,
        expiry_ms: Option<TimestampMs>,
    ) -> Result<()>;
}

#[async_trait]
pub trait MuteBackend: Send + Sync {
    async fn apply_mute(
        &self,
        player: &PlayerHandle,
        reason: &str,
        expiry_ms: TimestampMs,
    ) -> Result<()>;
}

#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn disconnect(&self, player: &PlayerHandle, reason: &str) -> Result<()>;
}

#[async_trait]
pub trait MovementLockBackend: Send + Sync {
    /// Freezing is the only reversible enforcement state; unfreezing happens
    /// through administrator tooling, never through this engine.
    async fn set_frozen(&self, player: &PlayerHandle, frozen: bool) -> Result<()>;
}

#[async_trait]
pub trait MessagingBackend: Send + Sync {
    async fn send_to_player(&self, player: &PlayerHandle, text: &str) -> Result<()>;
}

#[async_trait]
pub trait NotificationBackend: Send + Sync {
    async fn notify_admins(&self, text: &str) -> Result<()>;
}

/// Structured audit sink. Infallible by contract: a log sink that can fail
/// would need its own failure log.
pub trait LogBackend: Send + Sync {
    fn record(&self, entry: LogEntry);
}

/// One audit line: what ran, against whom, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Machine-readable action tag, e.g. "automod_kick"
    pub action: String,
    /// Display name of the affected player
    pub target: String,
    pub details: String,
    pub reason: String,
}

/// Log sink that forwards entries to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl LogBackend for TracingLog {
    fn record(&self, entry: LogEntry) {
        tracing::info!(
            action = %entry.action,
            target = %entry.target,
            details = %entry.details,
            reason = %entry.reason,
            "enforcement log"
        );
    }
}

/// Result of attempting one rule's action. Consumed by logging and admin
/// notification; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: ActionType,
    pub succeeded: bool,
    pub error_reason: Option<String>,
    pub applied_params: BTreeMap<String, String>,
}

impl ActionOutcome {
    pub fn success(action: ActionType, applied_params: BTreeMap<String, String>) -> Self {
        Self {
            action,
            succeeded: true,
            error_reason: None,
            applied_params,
        }
    }

    pub fn failure(
        action: ActionType,
        reason: impl Into<String>,
        applied_params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            action,
            succeeded: false,
            error_reason: Some(reason.into()),
            applied_params,
        }
    }
}

/// The full set of collaborators the dispatcher can reach.
#[derive(Clone)]
pub struct Backends {
    pub bans: Arc<dyn BanBackend>,
    pub mutes: Arc<dyn MuteBackend>,
    pub sessions: Arc<dyn SessionBackend>,
    pub movement: Arc<dyn MovementLockBackend>,
    pub messaging: Arc<dyn MessagingBackend>,
    pub notifications: Arc<dyn NotificationBackend>,
    pub log: Arc<dyn LogBackend>,
}
