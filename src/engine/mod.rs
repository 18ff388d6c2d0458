//! Violation accumulation and automated escalation

mod evaluator;
mod ingress;

pub use evaluator::{evaluate, PendingRule};
pub use ingress::ViolationIngress;
