// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Time-based scan jobs driven by the recurring scheduler
//!
//! Unlike trigger events, which arrive when something changes, scans walk the
//! stored entities looking for conditions that only time can create: tasks
//! past their due date, deals nobody has touched, pipeline totals going
//! unreported. Scans produce the same kinds of output as rules do, delivery
//! jobs and trigger events, so everything downstream is shared.

use crate::error::EngineError;
use crate::executor::NotificationJob;
use crate::{jobs, queues};
use chrono::{DateTime, Utc};
use loam_adapters::{EntityRegistry, IdempotencyStore, JobOptions, JobQueue};
use loam_core::entity::field;
use loam_core::{Clock, Entity, EntityKind, Trigger, TriggerEvent};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Days without activity before an open deal counts as stale
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 30;

/// One overdue reminder per task per assignee per day
const OVERDUE_DEDUP_TTL_SECONDS: i64 = 86_400;

/// The scan job implementations
pub struct Scans<C: Clock> {
    registry: EntityRegistry,
    queue: Arc<dyn JobQueue>,
    idempotency: Arc<dyn IdempotencyStore>,
    clock: C,
    stale_after_days: i64,
}

impl<C: Clock> Scans<C> {
    pub fn new(
        registry: EntityRegistry,
        queue: Arc<dyn JobQueue>,
        idempotency: Arc<dyn IdempotencyStore>,
        clock: C,
    ) -> Self {
        Self {
            registry,
            queue,
            idempotency,
            clock,
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
        }
    }

    pub fn with_stale_after_days(mut self, days: i64) -> Self {
        self.stale_after_days = days;
        self
    }

    /// Notify assignees of tasks past due; returns how many were notified
    pub async fn check_overdue_tasks(&self) -> Result<usize, EngineError> {
        let now = self.clock.now();
        let tasks = self.registry.repo(EntityKind::Task)?.list().await?;
        let mut notified = 0;

        for task in &tasks {
            if field(task, "status").as_str() == Some("completed") {
                continue;
            }
            let Some(due) = parse_timestamp(field(task, "due_date")) else {
                continue;
            };
            if due > now {
                continue;
            }
            let Some(assignee) = field(task, "assignee_id").as_str() else {
                continue;
            };
            let Some(task_id) = field(task, "id").as_str() else {
                continue;
            };

            let key = format!(
                "overdue:{}:{}:{}",
                task_id,
                assignee,
                now.format("%Y-%m-%d")
            );
            if !self.idempotency.claim(&key, OVERDUE_DEDUP_TTL_SECONDS).await? {
                continue;
            }

            let title = field(task, "title").as_str().unwrap_or("(untitled)");
            let payload = NotificationJob {
                user_id: assignee.to_string(),
                title: format!("Task overdue: {}", title),
                body: format!("\"{}\" was due {}", title, due.format("%Y-%m-%d")),
            };
            self.queue
                .enqueue(
                    queues::NOTIFICATION,
                    jobs::SEND_NOTIFICATION,
                    serde_json::to_value(&payload)?,
                    JobOptions::default(),
                )
                .await?;
            notified += 1;
        }

        tracing::info!(scanned = tasks.len(), notified, "overdue task scan complete");
        Ok(notified)
    }

    /// Feed stale open deals back into the automation pipeline as
    /// `DEAL_STALE` events at depth 0
    pub async fn check_stale_deals(&self) -> Result<usize, EngineError> {
        let now = self.clock.now();
        let deals = self.registry.repo(EntityKind::Deal)?.list().await?;
        let mut flagged = 0;

        for deal in &deals {
            if field(deal, "status").as_str() != Some("open") {
                continue;
            }
            let Some(last_activity) = parse_timestamp(field(deal, "last_activity_at")) else {
                continue;
            };
            if now - last_activity < chrono::Duration::days(self.stale_after_days) {
                continue;
            }
            let Some(deal_id) = field(deal, "id").as_str() else {
                continue;
            };

            let event = TriggerEvent::new(Trigger::DealStale, EntityKind::Deal, deal_id);
            // Broker dedup per deal per day: a rerun of the scan cannot
            // double-fire stale automations
            let job_id = format!("stale:{}:{}", deal_id, now.format("%Y-%m-%d"));
            self.queue
                .enqueue(
                    queues::AUTOMATION,
                    jobs::EVALUATE_TRIGGER,
                    serde_json::to_value(&event)?,
                    JobOptions::with_job_id(job_id),
                )
                .await?;
            flagged += 1;
        }

        tracing::info!(scanned = deals.len(), flagged, "stale deal scan complete");
        Ok(flagged)
    }

    /// Rewrite the current pipeline aggregates
    pub async fn refresh_pipeline_stats(&self) -> Result<(), EngineError> {
        let stats = self.aggregate_open_deals().await?;
        let mut row = Entity::new();
        row.insert("id".to_string(), json!("pipeline-stats-current"));
        row.insert("type".to_string(), json!("pipeline_stats"));
        row.insert("stages".to_string(), stats);
        row.insert(
            "refreshed_at".to_string(),
            json!(self.clock.now().to_rfc3339()),
        );
        self.registry.repo(EntityKind::Activity)?.create(row).await?;
        Ok(())
    }

    /// Append today's pipeline snapshot; same-day reruns overwrite in place
    pub async fn daily_pipeline_snapshot(&self) -> Result<(), EngineError> {
        let now = self.clock.now();
        let stats = self.aggregate_open_deals().await?;
        let date = now.format("%Y-%m-%d").to_string();
        let mut row = Entity::new();
        row.insert("id".to_string(), json!(format!("pipeline-snapshot-{date}")));
        row.insert("type".to_string(), json!("pipeline_snapshot"));
        row.insert("snapshot_date".to_string(), json!(date));
        row.insert("stages".to_string(), stats);
        self.registry.repo(EntityKind::Activity)?.create(row).await?;
        Ok(())
    }

    /// Open deal count and total value per stage
    async fn aggregate_open_deals(&self) -> Result<Value, EngineError> {
        let deals = self.registry.repo(EntityKind::Deal)?.list().await?;
        let mut stages: BTreeMap<String, (u64, f64)> = BTreeMap::new();

        for deal in &deals {
            if field(deal, "status").as_str() != Some("open") {
                continue;
            }
            let stage = field(deal, "stage").as_str().unwrap_or("unknown").to_string();
            let value = field(deal, "value").as_f64().unwrap_or(0.0);
            let entry = stages.entry(stage).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += value;
        }

        Ok(Value::Object(
            stages
                .into_iter()
                .map(|(stage, (count, value))| {
                    (stage, json!({"count": count, "value": value}))
                })
                .collect(),
        ))
    }
}

/// Parse an RFC 3339 timestamp field; anything else reads as absent
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
#[path = "scans_tests.rs"]
mod tests;
