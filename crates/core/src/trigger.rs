// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Trigger kinds that activate automation rules

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of event that can activate automation rules
///
/// Entity-mutation triggers are produced by the CRUD layer (and by the
/// `update_field` action re-trigger); `DealStale` is synthesized by the
/// recurring stale-deal scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    DealCreated,
    DealUpdated,
    DealStageChanged,
    DealStale,
    ContactCreated,
    ContactUpdated,
    CompanyCreated,
    CompanyUpdated,
    TaskCreated,
    TaskUpdated,
    TaskCompleted,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::DealCreated => "DEAL_CREATED",
            Trigger::DealUpdated => "DEAL_UPDATED",
            Trigger::DealStageChanged => "DEAL_STAGE_CHANGED",
            Trigger::DealStale => "DEAL_STALE",
            Trigger::ContactCreated => "CONTACT_CREATED",
            Trigger::ContactUpdated => "CONTACT_UPDATED",
            Trigger::CompanyCreated => "COMPANY_CREATED",
            Trigger::CompanyUpdated => "COMPANY_UPDATED",
            Trigger::TaskCreated => "TASK_CREATED",
            Trigger::TaskUpdated => "TASK_UPDATED",
            Trigger::TaskCompleted => "TASK_COMPLETED",
        };
        write!(f, "{}", name)
    }
}
