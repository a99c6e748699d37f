// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Collaborator interfaces for the automation engine
//!
//! The engine talks to the rest of the system exclusively through the traits
//! in this crate: entity/rule/audit/user stores, the idempotency store, the
//! durable job queue, and the outbound mailer. Each trait ships with an
//! in-memory implementation that serves single-process runs and tests; the
//! production deployment binds these to the real database and broker.

pub mod audit;
pub mod entity;
pub mod idempotency;
pub mod mailer;
pub mod queue;
pub mod rules;
pub mod traced;
pub mod users;

pub use audit::{AuditStore, MemoryAuditStore};
pub use entity::{EntityRegistry, EntityRepository, MemoryRepository, StoreError};
pub use idempotency::{IdempotencyStore, MemoryIdempotencyStore};
pub use mailer::{MailError, Mailer, MemoryMailer, NoOpMailer, SentEmail};
pub use queue::{ClaimedJob, DeadLetter, JobOptions, JobQueue, MemoryJobQueue, QueueError};
pub use rules::{MemoryRuleStore, RuleStore};
pub use traced::TracedJobQueue;
pub use users::{MemoryUserDirectory, UserDirectory};
