// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loam-engine: the automation execution engine
//!
//! Consumes trigger events from the durable queue, evaluates rule conditions
//! against a fresh entity snapshot, executes action chains, and writes the
//! audit log. Recursive re-triggering through `update_field` is bounded by
//! depth counting; duplicate deliveries are collapsed by TTL idempotency
//! claims. The recurring scheduler and the scan jobs it drives live here too.

pub mod engine;
pub mod error;
pub mod executor;
pub mod permission;
pub mod scans;
pub mod scheduler;

/// Queue names shared by producers and consumers
pub mod queues {
    pub const AUTOMATION: &str = "automation";
    pub const EMAIL: &str = "email";
    pub const NOTIFICATION: &str = "notification";
    pub const MAINTENANCE: &str = "maintenance";
}

/// Job names carried on the queues
pub mod jobs {
    pub const EVALUATE_TRIGGER: &str = "evaluate-trigger";
    pub const SEND_EMAIL: &str = "send-email";
    pub const SEND_NOTIFICATION: &str = "send-notification";
    pub const REFRESH_PIPELINE_STATS: &str = "refresh-pipeline-stats";
    pub const DAILY_PIPELINE_SNAPSHOT: &str = "daily-pipeline-snapshot";
    pub const CHECK_OVERDUE_TASKS: &str = "check-overdue-tasks";
    pub const CHECK_STALE_DEALS: &str = "check-stale-deals";
}

pub use engine::AutomationEngine;
pub use error::EngineError;
pub use executor::{ActionExecutor, EmailJob, ExecuteError, NotificationJob};
pub use permission::{check_creator, PermissionCheck};
pub use scans::Scans;
pub use scheduler::{RecurringJob, RecurringScheduler, Schedule};
