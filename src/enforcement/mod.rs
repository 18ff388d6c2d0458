//! Enforcement: collaborator seams, action dispatch, audit fan-out

pub mod backends;
pub mod dispatcher;
pub mod ledger;
pub mod messages;

pub use backends::{
    ActionOutcome, Backends, BanBackend, LogBackend, LogEntry, MessagingBackend,
    MovementLockBackend, MuteBackend, NotificationBackend, SessionBackend, TracingLog,
};
pub use dispatcher::ActionDispatcher;
pub use ledger::{Punishment, PunishmentKind, PunishmentLedger};
pub use messages::{MessageCatalog, MessageContext};
