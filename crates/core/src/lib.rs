// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loam-core: domain model for the CRM automation engine
//!
//! This crate provides:
//! - The trigger/condition/action vocabulary of automation rules
//! - Pure condition evaluation and template interpolation
//! - Versioned payload envelopes for rule configuration
//! - Clock and ID abstractions for testable time and identity

pub mod clock;
pub mod id;

pub mod action;
pub mod condition;
pub mod entity;
pub mod envelope;
pub mod event;
pub mod interpolate;
pub mod log;
pub mod role;
pub mod rule;
pub mod trigger;

// Re-exports
pub use action::Action;
pub use clock::{Clock, FakeClock, SystemClock};
pub use condition::{matches_conditions, Condition, Operator};
pub use entity::{Entity, EntityKind};
pub use envelope::{decode_payload, PayloadError};
pub use event::{FieldChange, TriggerEvent, MAX_AUTOMATION_DEPTH};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use interpolate::interpolate;
pub use log::{AutomationLog, LogStatus, SYSTEM_AUTOMATION_ID};
pub use role::{can_perform, Capability, Role};
pub use rule::AutomationRule;
pub use trigger::Trigger;
