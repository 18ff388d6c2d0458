//! Cheat detectors: pure pattern checks over host-provided samples
//!
//! Detectors decide *whether* behavior looks suspicious and report a
//! [`Violation`](crate::core::types::Violation); the escalation engine
//! decides what happens next. None of these functions touch engine state.

pub mod chat;
pub mod movement;
pub mod world;
