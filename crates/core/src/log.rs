// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Append-only automation audit log entries
//!
//! Exactly one row is written per (automation, triggering event) evaluation
//! attempt that reaches the evaluation stage. Depth-limit and permission
//! skips produce a `Skipped` row; delivery-level duplicates produce no row
//! at all. The log is the primary tool for answering "why didn't my
//! automation fire".

use crate::entity::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel automation id used when no specific rule is implicated
/// (e.g. a depth-limit skip applies to the whole event)
pub const SYSTEM_AUTOMATION_ID: &str = "system";

/// Outcome of one rule evaluation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Failed,
    Skipped,
}

/// One audit row; never mutated or deleted by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationLog {
    pub automation_id: String,
    pub status: LogStatus,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AutomationLog {
    pub fn success(
        automation_id: impl Into<String>,
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            automation_id: automation_id.into(),
            status: LogStatus::Success,
            entity_kind,
            entity_id: entity_id.into(),
            error: None,
            timestamp,
        }
    }

    pub fn failed(
        automation_id: impl Into<String>,
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        error: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            automation_id: automation_id.into(),
            status: LogStatus::Failed,
            entity_kind,
            entity_id: entity_id.into(),
            error: Some(error.into()),
            timestamp,
        }
    }

    pub fn skipped(
        automation_id: impl Into<String>,
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            automation_id: automation_id.into(),
            status: LogStatus::Skipped,
            entity_kind,
            entity_id: entity_id.into(),
            error: Some(reason.into()),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_status_and_reason() {
        let now = Utc::now();
        let ok = AutomationLog::success("a-1", EntityKind::Deal, "d-1", now);
        assert_eq!(ok.status, LogStatus::Success);
        assert!(ok.error.is_none());

        let failed = AutomationLog::failed("a-1", EntityKind::Deal, "d-1", "boom", now);
        assert_eq!(failed.status, LogStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        let skipped =
            AutomationLog::skipped(SYSTEM_AUTOMATION_ID, EntityKind::Deal, "d-1", "depth", now);
        assert_eq!(skipped.status, LogStatus::Skipped);
        assert_eq!(skipped.automation_id, "system");
    }
}
